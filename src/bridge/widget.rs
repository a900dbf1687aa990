//! Greeting widget state
//!
//! Holds the greeting data pushed by the host and renders either the greeting
//! or a neutral placeholder until the bridge handshake completes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::bridge::{
    client::{AppInfo, BridgeClient, InitializeParams},
    host::TOOL_RESULT_NOTIFICATION,
};

pub const WIDGET_NAME: &str = "greeting-widget";
pub const WIDGET_VERSION: &str = "1.0.0";
pub const WIDGET_EMOJI: &str = "👋";
pub const DEFAULT_HEADLINE: &str = "Welcome to ChatAppDemo! 👋";
pub const INITIALIZING_STATUS: &str = "Initializing...";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub emoji: &'static str,
    pub headline: String,
    pub status: Option<&'static str>,
}

#[derive(Clone)]
pub struct GreetingWidget {
    bridge: BridgeClient,
    data: Arc<Mutex<GreetingData>>,
}

impl GreetingWidget {
    /// Tool results are accepted from the moment of attachment, before the
    /// handshake finishes.
    pub fn attach(bridge: BridgeClient) -> Self {
        let data = Arc::new(Mutex::new(GreetingData::default()));
        let sink = data.clone();

        bridge.on_notification(TOOL_RESULT_NOTIFICATION, move |params| {
            let Some(content) = structured_content(params) else {
                return;
            };

            match serde_json::from_value::<GreetingData>(content) {
                Ok(greeting) => *sink.lock().unwrap_or_else(PoisonError::into_inner) = greeting,
                Err(err) => debug!(error = %err, "ignoring tool result with unexpected shape"),
            }
        });

        Self { bridge, data }
    }

    pub fn bridge(&self) -> &BridgeClient {
        &self.bridge
    }

    pub fn app_info() -> AppInfo {
        AppInfo {
            name: WIDGET_NAME.to_string(),
            version: WIDGET_VERSION.to_string(),
        }
    }

    /// Returns whether the widget became ready.
    pub async fn start(&self) -> bool {
        match self
            .bridge
            .initialize(InitializeParams::new(Self::app_info()))
            .await
        {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "failed to initialize the widget bridge");
                false
            }
        }
    }

    pub fn data(&self) -> GreetingData {
        self.lock_data().clone()
    }

    pub fn render(&self) -> WidgetView {
        let headline = self
            .lock_data()
            .greeting
            .clone()
            .filter(|greeting| !greeting.is_empty())
            .unwrap_or_else(|| DEFAULT_HEADLINE.to_string());

        WidgetView {
            emoji: WIDGET_EMOJI,
            headline,
            status: (!self.bridge.is_ready()).then_some(INITIALIZING_STATUS),
        }
    }

    fn lock_data(&self) -> MutexGuard<'_, GreetingData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn structured_content(params: Option<Value>) -> Option<Value> {
    params?
        .get_mut("structuredContent")
        .map(Value::take)
        .filter(|content| !content.is_null())
}
