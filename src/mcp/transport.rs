//! Stateless streamable HTTP transport
//!
//! One `StatelessHttpTransport` is bound to exactly one HTTP exchange. It never
//! issues or honors an `Mcp-Session-Id`; every exchange is self-contained.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::rpc::{json_rpc_error, INTERNAL_ERROR, PARSE_ERROR, SERVER_ERROR};
use crate::mcp::server::McpServer;
use crate::mcp::session::SessionObserver;

pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

pub struct StatelessHttpTransport {
    exchange_id: Uuid,
    observer: Arc<dyn SessionObserver>,
    server: Mutex<Option<Arc<McpServer>>>,
    response: Mutex<Option<Response>>,
    closed: AtomicBool,
}

impl StatelessHttpTransport {
    pub fn new(exchange_id: Uuid, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            exchange_id,
            observer,
            server: Mutex::new(None),
            response: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn connect(&self, server: Arc<McpServer>) -> Result<(), AppError> {
        if self.is_closed() {
            return Err(AppError::internal("transport is closed"));
        }

        let mut slot = self
            .server
            .lock()
            .map_err(|_| AppError::internal("transport server slot poisoned"))?;
        if slot.is_some() {
            return Err(AppError::internal("transport is already connected"));
        }

        *slot = Some(server);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent; the observer hears about the first close only.
    pub fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.observer.transport_closed(self.exchange_id);
        let mut slot = self
            .server
            .lock()
            .map_err(|_| AppError::internal("transport server slot poisoned"))?;
        slot.take();
        Ok(())
    }

    pub fn take_response(&self) -> Option<Response> {
        self.response.lock().ok().and_then(|mut slot| slot.take())
    }

    pub async fn handle_request(&self, request: Request) -> Result<(), AppError> {
        let server = self.connected_server()?;

        let method = request.method().clone();
        match method {
            Method::POST => self.handle_post(&server, request).await,
            Method::GET => self.respond(method_not_allowed(
                "Server-initiated streams are not available in stateless mode.",
            )),
            Method::DELETE => self.respond(StatusCode::OK.into_response()),
            _ => self.respond(method_not_allowed("Method not allowed.")),
        }
    }

    async fn handle_post(&self, server: &McpServer, request: Request) -> Result<(), AppError> {
        if !is_json_content_type(request.headers()) {
            return self.respond(
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Json(json_rpc_error(
                        None,
                        SERVER_ERROR,
                        "Unsupported Media Type: Content-Type must be application/json",
                    )),
                )
                    .into_response(),
            );
        }

        let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|err| AppError::internal(format!("failed to read request body: {err}")))?;

        let payload: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => {
                return self.respond(
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
                    )
                        .into_response(),
                )
            }
        };

        match server.handle_payload(payload) {
            Some(response) => self.respond((StatusCode::OK, Json(response)).into_response()),
            None => self.respond(StatusCode::ACCEPTED.into_response()),
        }
    }

    fn connected_server(&self) -> Result<Arc<McpServer>, AppError> {
        if self.is_closed() {
            return Err(AppError::internal("transport is closed"));
        }

        self.server
            .lock()
            .map_err(|_| AppError::internal("transport server slot poisoned"))?
            .clone()
            .ok_or_else(|| AppError::internal("transport is not connected to a server"))
    }

    fn respond(&self, response: Response) -> Result<(), AppError> {
        let mut slot = self
            .response
            .lock()
            .map_err(|_| AppError::internal("transport response slot poisoned"))?;
        if slot.is_some() {
            return Err(AppError::internal("response already sent for this exchange"));
        }

        *slot = Some(response);
        Ok(())
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn method_not_allowed(message: &str) -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json_rpc_error(None, SERVER_ERROR, message)),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("POST, DELETE"));
    response
}

/// Answer for exchanges that failed before the transport committed a response.
pub fn internal_server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json_rpc_error(None, INTERNAL_ERROR, "Internal server error")),
    )
        .into_response()
}
