//! Widget/host bridge
//!
//! JSON-RPC call correlation, notifications and the initialization handshake
//! carried over an untyped cross-context message channel.

pub mod channel;
pub mod client;
pub mod envelope;
pub mod host;
pub mod widget;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("call rejected by host: {0}")]
    Rejected(Value),
    #[error("bridge closed before the call settled")]
    Closed,
    #[error("message channel closed")]
    ChannelClosed,
    #[error("bridge already initialized")]
    AlreadyInitialized,
    #[error("failed to encode params: {0}")]
    Encode(#[from] serde_json::Error),
}
