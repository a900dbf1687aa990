//! Plugin manifest and OpenAPI documents for the plain HTTP surface.

use serde_json::{json, Value};

pub const OPENAPI_PATH: &str = "/openapi.json";
pub const MANIFEST_PATH: &str = "/.well-known/ai-plugin.json";
pub const GREET_PATH: &str = "/greet";
pub const LOGO_PATH: &str = "/logo.png";
pub const LEGAL_PATH: &str = "/legal";

pub fn manifest(base_url: &str) -> Value {
    json!({
        "schema_version": "v1",
        "name_for_human": "ChatAppDemo",
        "name_for_model": "chatappdemo",
        "description_for_human": "A simple greeting app that says hello.",
        "description_for_model": "Use this app to greet people by name with a friendly message.",
        "auth": {
            "type": "none",
        },
        "api": {
            "type": "openapi",
            "url": format!("{base_url}{OPENAPI_PATH}"),
        },
        "logo_url": format!("{base_url}{LOGO_PATH}"),
        "contact_email": "support@example.com",
        "legal_info_url": format!("{base_url}{LEGAL_PATH}"),
    })
}

/// The manifest is delivered as one server-sent event.
pub fn manifest_event(base_url: &str) -> String {
    format!("data: {}\n\n", manifest(base_url))
}

pub fn openapi_document(base_url: &str) -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "ChatAppDemo API",
            "description": "A simple greeting API for ChatGPT",
            "version": "1.0.0",
        },
        "servers": [
            { "url": base_url },
        ],
        "paths": {
            GREET_PATH: {
                "post": {
                    "operationId": "greetPerson",
                    "summary": "Greet a person by name",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["name"],
                                    "properties": {
                                        "name": {
                                            "type": "string",
                                            "description": "The name of the person to greet",
                                        },
                                    },
                                },
                            },
                        },
                    },
                    "responses": {
                        "200": {
                            "description": "Successful greeting",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "message": {
                                                "type": "string",
                                                "description": "The greeting message",
                                            },
                                            "timestamp": {
                                                "type": "string",
                                                "format": "date-time",
                                                "description": "When the greeting was generated",
                                            },
                                        },
                                    },
                                },
                            },
                        },
                    },
                },
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_points_at_openapi_document() {
        let manifest = manifest("https://demo.example");
        assert_eq!(manifest["api"]["url"], "https://demo.example/openapi.json");
        assert_eq!(manifest["name_for_model"], "chatappdemo");
    }

    #[test]
    fn manifest_event_is_single_sse_frame() {
        let event = manifest_event("http://localhost:3000");
        assert!(event.starts_with("data: {"));
        assert!(event.ends_with("\n\n"));
    }

    #[test]
    fn openapi_describes_greet_operation() {
        let document = openapi_document("http://localhost:3000");
        assert_eq!(
            document["paths"]["/greet"]["post"]["operationId"],
            "greetPerson"
        );
        assert_eq!(document["servers"][0]["url"], "http://localhost:3000");
    }
}
