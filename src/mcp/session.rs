//! Per-exchange protocol sessions
//!
//! Every protocol exchange gets a fresh `McpServer` and a fresh
//! `StatelessHttpTransport`. A `SessionRelease` guard is armed before the
//! exchange reaches the transport, so both are closed on every exit path:
//! normal completion, an error, or the handler future being dropped because
//! the client went away.

use std::sync::Arc;

use axum::{extract::Request, response::Response};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::mcp::server::McpServer;
use crate::mcp::transport::{internal_server_error, StatelessHttpTransport};
use crate::AppState;

/// Lifecycle hooks for protocol sessions. The default methods only log.
pub trait SessionObserver: Send + Sync {
    fn session_opened(&self, exchange_id: Uuid) {
        info!(exchange_id = %exchange_id, "protocol session opened");
    }

    fn transport_closed(&self, exchange_id: Uuid) {
        info!(exchange_id = %exchange_id, "protocol transport closed");
    }

    fn server_closed(&self, exchange_id: Uuid) {
        info!(exchange_id = %exchange_id, "protocol server closed");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {}

struct SessionRelease {
    server: Arc<McpServer>,
    transport: Arc<StatelessHttpTransport>,
}

impl Drop for SessionRelease {
    fn drop(&mut self) {
        if let Err(err) = self.transport.close() {
            warn!(
                exchange_id = %self.server.exchange_id(),
                error = %err,
                "failed to close protocol transport"
            );
        }
        self.server.close();
    }
}

pub async fn handle_exchange(state: AppState, request: Request) -> Response {
    let exchange_id = Uuid::new_v4();
    let observer = state.session_observer.clone();

    let server = Arc::new(McpServer::new(exchange_id, observer.clone()));
    let transport = Arc::new(StatelessHttpTransport::new(exchange_id, observer.clone()));
    observer.session_opened(exchange_id);

    let _release = SessionRelease {
        server: server.clone(),
        transport: transport.clone(),
    };

    if let Err(err) = transport.connect(server) {
        error!(exchange_id = %exchange_id, error = %err, "failed to connect protocol transport");
        return internal_server_error();
    }

    let outcome = transport.handle_request(request).await;
    let response = transport.take_response();

    match (outcome, response) {
        (Ok(()), Some(response)) => response,
        (Err(err), Some(response)) => {
            error!(
                exchange_id = %exchange_id,
                error = %err,
                "protocol exchange failed after response was committed"
            );
            response
        }
        (Err(err), None) => {
            error!(exchange_id = %exchange_id, error = %err, "protocol exchange failed");
            internal_server_error()
        }
        (Ok(()), None) => {
            error!(exchange_id = %exchange_id, "protocol transport produced no response");
            internal_server_error()
        }
    }
}
