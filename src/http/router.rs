//! Request classification and dispatch
//!
//! `classify` is a pure function of method and path. `dispatch` is the single
//! axum entry point and is the only place that touches protocol sessions.

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};

use crate::domain::plugin::{GREET_PATH, LEGAL_PATH, LOGO_PATH, MANIFEST_PATH, OPENAPI_PATH};
use crate::http::{cors, handlers};
use crate::mcp::session::handle_exchange;
use crate::AppState;

pub const ROOT_PATH: &str = "/";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Root,
    Health,
    ProtocolExchange,
    Plugin(PluginRoute),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginRoute {
    Manifest,
    OpenApi,
    Greet,
    Logo,
    Legal,
}

pub fn is_protocol_method(method: &Method) -> bool {
    method == Method::POST || method == Method::GET || method == Method::DELETE
}

pub fn classify(method: &Method, path: &str, protocol_path: &str) -> Route {
    if method == Method::OPTIONS {
        return Route::Preflight;
    }

    if path == protocol_path {
        return if is_protocol_method(method) {
            Route::ProtocolExchange
        } else {
            Route::NotFound
        };
    }

    match (method.as_str(), path) {
        ("GET", ROOT_PATH) => Route::Root,
        ("GET", HEALTH_PATH) => Route::Health,
        ("GET", MANIFEST_PATH) => Route::Plugin(PluginRoute::Manifest),
        ("GET", OPENAPI_PATH) => Route::Plugin(PluginRoute::OpenApi),
        ("POST", GREET_PATH) => Route::Plugin(PluginRoute::Greet),
        ("GET", LOGO_PATH) => Route::Plugin(PluginRoute::Logo),
        ("GET", LEGAL_PATH) => Route::Plugin(PluginRoute::Legal),
        _ => Route::NotFound,
    }
}

pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let route = classify(request.method(), request.uri().path(), &state.config.path);

    match route {
        Route::Preflight => cors::preflight_response(),
        Route::Root => handlers::root().await.into_response(),
        Route::Health => handlers::health().await.into_response(),
        Route::ProtocolExchange => handle_exchange(state, request).await,
        Route::Plugin(PluginRoute::Manifest) => {
            handlers::manifest(&state, request.headers()).await
        }
        Route::Plugin(PluginRoute::OpenApi) => {
            handlers::openapi(&state, request.headers()).await
        }
        Route::Plugin(PluginRoute::Greet) => handlers::greet(request).await,
        Route::Plugin(PluginRoute::Logo) => handlers::logo().await.into_response(),
        Route::Plugin(PluginRoute::Legal) => handlers::legal().await.into_response(),
        Route::NotFound => handlers::not_found().await.into_response(),
    }
}
