//! Cross-context message channel
//!
//! Models `postMessage` between a sandboxed widget and its embedding host:
//! unbounded, fire-and-forget, and every delivered message carries the
//! identity of the context that posted it.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::bridge::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub source: ContextId,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct MessagePort {
    source: ContextId,
    target: mpsc::UnboundedSender<InboundMessage>,
}

impl MessagePort {
    pub fn new(source: ContextId, target: mpsc::UnboundedSender<InboundMessage>) -> Self {
        Self { source, target }
    }

    pub fn post_message(&self, data: Value) -> Result<(), BridgeError> {
        self.target
            .send(InboundMessage {
                source: self.source,
                data,
            })
            .map_err(|_| BridgeError::ChannelClosed)
    }
}

/// One side of a connected pair: a port to the other side and an inbox.
pub struct Endpoint {
    pub port: MessagePort,
    pub inbox: mpsc::UnboundedReceiver<InboundMessage>,
}

pub fn connect(left: ContextId, right: ContextId) -> (Endpoint, Endpoint) {
    let (left_tx, left_rx) = mpsc::unbounded_channel();
    let (right_tx, right_rx) = mpsc::unbounded_channel();

    (
        Endpoint {
            port: MessagePort::new(left, right_tx),
            inbox: left_rx,
        },
        Endpoint {
            port: MessagePort::new(right, left_tx),
            inbox: right_rx,
        },
    )
}
