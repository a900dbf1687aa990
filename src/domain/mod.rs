//! Domain objects and tool/resource integrations
//!
//! Provides the greeting business logic and the documents exposed over MCP and plain HTTP.

pub mod greeting;
pub mod plugin;
pub mod resources;
pub mod tools;
