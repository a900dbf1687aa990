//! The central Model Context Protocol engine
//!
//! `McpServer` is one protocol-server instance. It registers its tool descriptors
//! at construction, decodes JSON-RPC messages, routes methods (`initialize`,
//! `ping`, `tools/*`, `resources/*`) and is closed exactly once by its owner.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rust_mcp_sdk::schema::{
    CallToolRequest, Implementation, InitializeRequest, InitializeResult, JsonrpcMessage,
    JsonrpcRequest, ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult,
    PingRequest, ReadResourceRequest, ServerCapabilities, ServerCapabilitiesResources,
    ServerCapabilitiesTools, Tool,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    resources::{build_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call},
};
use crate::errors::AppError;
use crate::mcp::rpc::{
    app_error_to_json_rpc, is_json_rpc_error, json_rpc_error, json_rpc_result,
    json_rpc_serialized, request_id_to_value, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    SERVER_ERROR,
};
use crate::mcp::session::SessionObserver;

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

pub struct McpServer {
    exchange_id: Uuid,
    tools: Vec<Tool>,
    observer: Arc<dyn SessionObserver>,
    closed: AtomicBool,
}

impl McpServer {
    pub fn new(exchange_id: Uuid, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            exchange_id,
            tools: build_tools_list(),
            observer,
            closed: AtomicBool::new(false),
        }
    }

    pub fn exchange_id(&self) -> Uuid {
        self.exchange_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Idempotent; only the first call reaches the observer.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.observer.server_closed(self.exchange_id);
    }

    /// Handles a decoded body: a single message or a batch.
    pub fn handle_payload(&self, payload: Value) -> Option<Value> {
        let Value::Array(batch) = payload else {
            return self.handle_message(payload);
        };

        if batch.is_empty() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let responses = batch
            .into_iter()
            .filter_map(|item| self.handle_message(item))
            .collect::<Vec<_>>();

        if responses.is_empty() {
            None
        } else {
            Some(Value::Array(responses))
        }
    }

    pub fn handle_message(&self, payload: Value) -> Option<Value> {
        if !payload.is_object() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let request_id = payload.get("id").cloned();
        if self.is_closed() {
            return request_id.map(|id| json_rpc_error(Some(id), SERVER_ERROR, "Server closed"));
        }

        let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
        };

        match parsed {
            JsonrpcMessage::Request(request) => {
                if let Err(error_response) = validate_request_shape(&request) {
                    return Some(error_response);
                }

                let request_id = request_id_to_value(request.id);
                if request.method.trim().is_empty() {
                    return Some(json_rpc_error(
                        Some(request_id),
                        INVALID_REQUEST,
                        "Invalid Request",
                    ));
                }

                Some(self.handle_request(
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                ))
            }
            JsonrpcMessage::Notification(notification) => {
                debug!(
                    exchange_id = %self.exchange_id,
                    method = %notification.method,
                    "mcp notification received"
                );
                None
            }
            JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
                Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request"))
            }
        }
    }

    pub fn handle_request(&self, id: Option<Value>, method: String, params: Option<Value>) -> Value {
        let audit_params = redact_audit_params(params.as_ref());

        let response = match method.as_str() {
            "initialize" => match negotiate_protocol_version(params.as_ref()) {
                Ok(protocol_version) => {
                    json_rpc_serialized(id, &initialize_result(protocol_version))
                }
                Err(err) => app_error_to_json_rpc(id, err),
            },
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_serialized(
                id,
                &ListToolsResult {
                    meta: None,
                    next_cursor: None,
                    tools: self.tools.clone(),
                },
            ),
            "tools/call" => handle_tools_call(&self.tools, id, params),
            "resources/list" => json_rpc_serialized(
                id,
                &ListResourcesResult {
                    meta: None,
                    next_cursor: None,
                    resources: build_resources_list(),
                },
            ),
            "resources/read" => handle_resources_read(id, params),
            _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
        };

        info!(
            exchange_id = %self.exchange_id,
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }
}

pub fn initialize_result(protocol_version: &str) -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("ChatAppDemo".to_string()),
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: None,
            ..Default::default()
        },
        protocol_version: protocol_version.to_string(),
        instructions: None,
        meta: None,
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let request_id = Some(request_id_to_value(request.id.clone()));
    let payload = serde_json::to_value(request)
        .map_err(|_| json_rpc_error(request_id.clone(), INVALID_REQUEST, "Invalid Request"))?;

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "resources/read" => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "resources/list" => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

/// Echoes a supported offered version, otherwise answers with the latest one.
pub fn negotiate_protocol_version(params: Option<&Value>) -> Result<&'static str, AppError> {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "invalid_protocol_version",
                "initialize params.protocolVersion is required",
            )
        })?;

    Ok(SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|version| *version == offered_version)
        .unwrap_or(LATEST_PROTOCOL_VERSION))
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
