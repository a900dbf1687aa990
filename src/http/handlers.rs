//! Axum HTTP handlers for the web server
//!
//! Liveness probes, the plugin manifest, the OpenAPI document and the plain
//! `POST /greet` action. The protocol endpoint lives in `mcp::session`.

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::greeting::greet as build_greeting;
use crate::domain::plugin::{manifest_event, openapi_document};
use crate::errors::AppError;
use crate::AppState;

pub const ROOT_BODY: &str = "ChatAppDemo MCP server";
const MAX_GREET_BODY_BYTES: usize = 100 * 1024;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GreetRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GreetResponse {
    pub message: String,
    pub timestamp: String,
}

pub async fn root() -> &'static str {
    ROOT_BODY
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn logo() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Logo not implemented")
}

pub async fn legal() -> &'static str {
    "Legal information not implemented"
}

pub async fn manifest(state: &AppState, headers: &HeaderMap) -> Response {
    let base_url = base_url(headers, state.config.port);

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        manifest_event(&base_url),
    )
        .into_response()
}

pub async fn openapi(state: &AppState, headers: &HeaderMap) -> Response {
    Json(openapi_document(&base_url(headers, state.config.port))).into_response()
}

pub async fn greet(request: Request) -> Response {
    let body = match to_bytes(request.into_body(), MAX_GREET_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            return AppError::internal(format!("failed to read request body: {err}"))
                .into_response()
        }
    };

    let parsed = serde_json::from_slice::<GreetRequest>(&body)
        .map_err(|err| err.to_string())
        .and_then(|input| build_greeting(&input.name).map_err(|err| err.to_string()));

    match parsed {
        Ok(greeting) => Json(GreetResponse {
            message: greeting.greeting,
            timestamp: greeting.timestamp,
        })
        .into_response(),
        Err(detail) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid input",
                "details": [{ "message": detail }],
            })),
        )
            .into_response(),
    }
}

/// Honors `x-forwarded-proto` and `host` the way reverse proxies set them.
pub fn base_url(headers: &HeaderMap, port: u16) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{port}"));

    format!("{scheme}://{host}")
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};

    use super::base_url;

    #[test]
    fn base_url_defaults_to_localhost() {
        assert_eq!(base_url(&HeaderMap::new(), 3000), "http://localhost:3000");
    }

    #[test]
    fn base_url_uses_forwarded_proto_and_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("demo.example"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(base_url(&headers, 3000), "https://demo.example");
    }
}
