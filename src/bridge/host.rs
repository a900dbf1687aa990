//! Embedding-host side of the bridge
//!
//! The host answers every request envelope with exactly one response carrying
//! the same id, and may push notifications such as tool results to the widget.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::{
    channel::{InboundMessage, MessagePort},
    envelope::{Envelope, Notification, Outcome, Response},
    BridgeError,
};

pub const TOOL_RESULT_NOTIFICATION: &str = "ui/notifications/tool-result";

#[async_trait]
pub trait HostOperations: Send + Sync {
    async fn handle_request(&self, method: &str, params: Option<Value>) -> Result<Value, Value>;

    async fn handle_notification(&self, method: &str, params: Option<Value>) {
        debug!(method, has_params = params.is_some(), "host ignored notification");
    }
}

pub struct BridgeHost<O> {
    operations: O,
    port: MessagePort,
}

impl<O: HostOperations> BridgeHost<O> {
    pub fn new(operations: O, port: MessagePort) -> Self {
        Self { operations, port }
    }

    pub fn operations(&self) -> &O {
        &self.operations
    }

    pub async fn handle_message(&self, message: InboundMessage) -> Result<(), BridgeError> {
        match Envelope::parse(&message.data) {
            Some(Envelope::Request(request)) => {
                let outcome = match self
                    .operations
                    .handle_request(&request.method, request.params)
                    .await
                {
                    Ok(result) => Outcome::Result(result),
                    Err(error) => Outcome::Error(error),
                };

                self.port.post_message(
                    Envelope::Response(Response {
                        id: request.id,
                        outcome,
                    })
                    .into_value(),
                )
            }
            Some(Envelope::Notification(notification)) => {
                self.operations
                    .handle_notification(&notification.method, notification.params)
                    .await;
                Ok(())
            }
            Some(Envelope::Response(_)) | None => {
                debug!("host ignored message that is not a widget request");
                Ok(())
            }
        }
    }

    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<(), BridgeError> {
        self.port.post_message(
            Envelope::Notification(Notification {
                method: method.to_string(),
                params,
            })
            .into_value(),
        )
    }

    pub fn notify_tool_result(&self, structured_content: Value) -> Result<(), BridgeError> {
        self.notify(
            TOOL_RESULT_NOTIFICATION,
            Some(json!({ "structuredContent": structured_content })),
        )
    }

    pub async fn serve(
        &self,
        mut inbox: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Result<(), BridgeError> {
        while let Some(message) = inbox.recv().await {
            self.handle_message(message).await?;
        }

        Ok(())
    }
}
