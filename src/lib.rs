use std::sync::Arc;

use axum::{middleware, Router};

pub mod bridge;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use config::Config;
use mcp::session::{LoggingObserver, SessionObserver};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session_observer: Arc<dyn SessionObserver>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_observer(config, Arc::new(LoggingObserver))
    }

    pub fn with_observer(config: Config, session_observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            config: Arc::new(config),
            session_observer,
        }
    }
}

/// Every request goes through `http::router::dispatch`, so the protocol path
/// can be configured at runtime and OPTIONS is answered on any path.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(http::router::dispatch)
        .layer(middleware::from_fn(http::cors::cors_headers))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
