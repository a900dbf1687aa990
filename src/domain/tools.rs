//! Tools exposed via Model Context Protocol
//!
//! Provides the `greet` tool. Its descriptor points hosts at the greeting widget
//! resource so the result can be rendered inside the embedded UI.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::greeting::{greet, Greeting};
use crate::domain::resources::WIDGET_RESOURCE_URI;
use crate::mcp::rpc::{
    json_rpc_error, json_rpc_error_with_data, json_rpc_serialized, INVALID_PARAMS, METHOD_NOT_FOUND,
};

pub const GREET_TOOL_NAME: &str = "greet";
pub const GREET_TOOL_TITLE: &str = "Greet someone";

#[macros::mcp_tool(
    name = "greet",
    description = "Greet a person by name with a friendly message"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GreetTool {
    /// The name of the person to greet
    pub name: String,
}

pub fn greet_tool_descriptor() -> Tool {
    let mut tool = GreetTool::tool();
    tool.title = Some(GREET_TOOL_TITLE.to_string());
    tool.meta = Some(serde_json::Map::from_iter([
        ("ui/resourceUri".to_string(), json!(WIDGET_RESOURCE_URI)),
        ("openai/outputTemplate".to_string(), json!(WIDGET_RESOURCE_URI)),
    ]));
    tool
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![greet_tool_descriptor()]
}

pub fn greeting_tool_result(greeting: &Greeting) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            greeting.greeting.clone(),
            None,
            None,
        ))],
        is_error: None,
        meta: None,
        structured_content: Some(serde_json::Map::from_iter([
            ("name".to_string(), json!(greeting.name)),
            ("greeting".to_string(), json!(greeting.greeting)),
            ("timestamp".to_string(), json!(greeting.timestamp)),
        ])),
    }
}

/// Input problems stay inside the call result so the session keeps going.
pub fn tool_error_result(message: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(message.into(), None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

pub fn call_greet(arguments: serde_json::Map<String, Value>) -> CallToolResult {
    let input: GreetTool = match serde_json::from_value(Value::Object(arguments)) {
        Ok(input) => input,
        Err(err) => return tool_error_result(format!("Invalid input: {err}")),
    };

    match greet(&input.name) {
        Ok(greeting) => greeting_tool_result(&greeting),
        Err(err) => tool_error_result(format!("Invalid input: {err}")),
    }
}

pub fn handle_tools_call(registered: &[Tool], id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    let is_registered = registered.iter().any(|tool| tool.name == tool_call.name);

    match tool_call.name.as_str() {
        GREET_TOOL_NAME if is_registered => {
            let result = call_greet(tool_call.arguments.unwrap_or_default());
            json_rpc_serialized(id, &result)
        }
        _ => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn arguments(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().expect("object arguments")
    }

    #[test]
    fn descriptor_links_widget_template() {
        let tool = greet_tool_descriptor();
        assert_eq!(tool.name, GREET_TOOL_NAME);
        assert_eq!(tool.title.as_deref(), Some(GREET_TOOL_TITLE));

        let serialized = serde_json::to_value(&tool).expect("tool serialization");
        assert_eq!(serialized["_meta"]["ui/resourceUri"], WIDGET_RESOURCE_URI);
        assert_eq!(serialized["inputSchema"]["type"], "object");
        assert!(serialized["inputSchema"]["properties"]["name"].is_object());
    }

    #[test]
    fn greet_returns_structured_content() {
        let result = call_greet(arguments(json!({ "name": "Ada" })));
        assert_eq!(result.is_error, None);

        let structured = result.structured_content.expect("structured content");
        assert_eq!(structured["name"], "Ada");
        assert_eq!(
            structured["greeting"],
            "Hello, Ada! Welcome to the ChatAppDemo. 👋"
        );
    }

    #[test]
    fn missing_name_is_call_scoped_error() {
        let result = call_greet(arguments(json!({})));
        assert_eq!(result.is_error, Some(true));
        assert!(result.structured_content.is_none());
    }

    #[test]
    fn blank_name_is_call_scoped_error() {
        let result = call_greet(arguments(json!({ "name": "  " })));
        assert_eq!(result.is_error, Some(true));
    }

    #[test]
    fn unregistered_tool_is_not_found() {
        let response = handle_tools_call(
            &[],
            Some(json!(7)),
            Some(json!({ "name": "greet", "arguments": { "name": "Ada" } })),
        );
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["data"]["code"], "tool_not_found");
    }
}
