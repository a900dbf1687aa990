//! Greeting construction shared by the REST, stdio and streamable HTTP surfaces.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const APP_DISPLAY_NAME: &str = "ChatAppDemo";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Greeting {
    pub name: String,
    pub greeting: String,
    pub timestamp: String,
}

pub fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(
            "invalid_name",
            "name must be a non-empty string",
        ));
    }

    Ok(trimmed.to_string())
}

pub fn greet(name: &str) -> Result<Greeting, AppError> {
    let name = normalize_name(name)?;
    let greeting = format!("Hello, {name}! Welcome to the {APP_DISPLAY_NAME}. 👋");

    Ok(Greeting {
        name,
        greeting,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
