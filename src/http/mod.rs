//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides request classification, CORS handling, and the probe and plugin endpoints.

pub mod cors;
pub mod handlers;
pub mod router;
