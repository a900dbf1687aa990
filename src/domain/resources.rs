//! Model Context Protocol resource providers
//!
//! Serves the greeting widget markup that hosts load into a sandboxed iframe.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};

use crate::mcp::rpc::{
    json_rpc_error, json_rpc_error_with_data, json_rpc_serialized, INVALID_PARAMS, METHOD_NOT_FOUND,
};

pub const WIDGET_RESOURCE_URI: &str = "ui://widget/greeting.html";
pub const WIDGET_MIME_TYPE: &str = "text/html;profile=mcp-app";

pub const WIDGET_HTML: &str = include_str!("../../assets/greeting-widget.html");

pub fn build_resources_list() -> Vec<Resource> {
    vec![Resource {
        annotations: None,
        description: Some("Widget that renders greeting tool results".to_string()),
        icons: vec![],
        meta: None,
        mime_type: Some(WIDGET_MIME_TYPE.to_string()),
        name: "Greeting Widget".to_string(),
        size: None,
        title: None,
        uri: WIDGET_RESOURCE_URI.to_string(),
    }]
}

pub fn handle_resources_read(id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match resource_read.uri.as_str() {
        WIDGET_RESOURCE_URI => json_rpc_serialized(
            id,
            &ReadResourceResult {
                contents: vec![ReadResourceContent::from(TextResourceContents {
                    meta: None,
                    mime_type: Some(WIDGET_MIME_TYPE.to_string()),
                    text: WIDGET_HTML.to_string(),
                    uri: WIDGET_RESOURCE_URI.to_string(),
                })],
                meta: None,
            },
        ),
        _ => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "resource_not_found",
                "message": "unknown resource uri",
                "details": {
                    "uri": resource_read.uri,
                },
            })),
        ),
    }
}
