//! Bridge wire envelopes
//!
//! Every message on the widget/host channel is a JSON-RPC 2.0 object. Inbound
//! data is classified into a closed set of shapes at the boundary; anything
//! that fits none of them is dropped by the caller.

use serde::Deserialize;
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Result(Value),
    Error(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Outcome {
    pub fn into_result(self) -> Result<Value, Value> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(error) => Err(error),
        }
    }
}

impl Envelope {
    /// Returns `None` for anything that is not one of the three shapes.
    pub fn parse(data: &Value) -> Option<Self> {
        let wire = WireMessage::deserialize(data).ok()?;
        if wire.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return None;
        }

        match (wire.id, wire.method) {
            (Some(id), method) => {
                let id = id.as_u64()?;
                match method {
                    Some(method) if wire.result.is_none() && wire.error.is_none() => {
                        Some(Self::Request(Request {
                            id,
                            method,
                            params: wire.params,
                        }))
                    }
                    _ => {
                        let outcome = match wire.error {
                            Some(error) => Outcome::Error(error),
                            None => Outcome::Result(wire.result.unwrap_or(Value::Null)),
                        };
                        Some(Self::Response(Response { id, outcome }))
                    }
                }
            }
            (None, Some(method)) => Some(Self::Notification(Notification {
                method,
                params: wire.params,
            })),
            (None, None) => None,
        }
    }

    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        object.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));

        match self {
            Self::Request(request) => {
                object.insert("id".to_string(), Value::from(request.id));
                object.insert("method".to_string(), Value::from(request.method));
                if let Some(params) = request.params {
                    object.insert("params".to_string(), params);
                }
            }
            Self::Response(response) => {
                object.insert("id".to_string(), Value::from(response.id));
                match response.outcome {
                    Outcome::Result(result) => object.insert("result".to_string(), result),
                    Outcome::Error(error) => object.insert("error".to_string(), error),
                };
            }
            Self::Notification(notification) => {
                object.insert("method".to_string(), Value::from(notification.method));
                if let Some(params) = notification.params {
                    object.insert("params".to_string(), params);
                }
            }
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_request_response_and_notification() {
        assert!(matches!(
            Envelope::parse(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ui/initialize" })),
            Some(Envelope::Request(Request { id: 1, .. }))
        ));
        assert!(matches!(
            Envelope::parse(&json!({ "jsonrpc": "2.0", "id": 1, "result": {} })),
            Some(Envelope::Response(Response { id: 1, outcome: Outcome::Result(_) }))
        ));
        assert!(matches!(
            Envelope::parse(&json!({ "jsonrpc": "2.0", "id": 2, "error": { "code": 1 } })),
            Some(Envelope::Response(Response { id: 2, outcome: Outcome::Error(_) }))
        ));
        assert!(matches!(
            Envelope::parse(&json!({ "jsonrpc": "2.0", "method": "ui/notifications/tool-result" })),
            Some(Envelope::Notification(_))
        ));
    }

    #[test]
    fn response_without_payload_resolves_to_null() {
        let envelope = Envelope::parse(&json!({ "jsonrpc": "2.0", "id": 3 }));
        assert_eq!(
            envelope,
            Some(Envelope::Response(Response {
                id: 3,
                outcome: Outcome::Result(Value::Null),
            }))
        );
    }

    #[test]
    fn null_error_is_not_a_rejection() {
        let envelope = Envelope::parse(&json!({ "jsonrpc": "2.0", "id": 4, "error": null }));
        assert!(matches!(
            envelope,
            Some(Envelope::Response(Response { outcome: Outcome::Result(_), .. }))
        ));
    }

    #[test]
    fn rejects_foreign_shapes() {
        for data in [
            json!("hello"),
            json!(null),
            json!({ "type": "resize", "height": 300 }),
            json!({ "jsonrpc": "1.0", "method": "x" }),
            json!({ "jsonrpc": "2.0" }),
            json!({ "jsonrpc": "2.0", "id": "abc", "result": {} }),
            json!({ "jsonrpc": "2.0", "id": -1, "result": {} }),
            json!({ "jsonrpc": 2, "id": 1, "result": {} }),
        ] {
            assert_eq!(Envelope::parse(&data), None, "{data} should be dropped");
        }
    }

    #[test]
    fn encodes_without_absent_fields() {
        let request = Envelope::Request(Request {
            id: 1,
            method: "ui/initialize".to_string(),
            params: None,
        })
        .into_value();
        assert_eq!(request, json!({ "jsonrpc": "2.0", "id": 1, "method": "ui/initialize" }));

        let notification = Envelope::Notification(Notification {
            method: "ui/notifications/initialized".to_string(),
            params: Some(json!({})),
        })
        .into_value();
        assert_eq!(
            notification,
            json!({ "jsonrpc": "2.0", "method": "ui/notifications/initialized", "params": {} })
        );
    }
}
