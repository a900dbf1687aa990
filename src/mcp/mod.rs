//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides the protocol engine, the stateless HTTP transport with its
//! per-exchange session lifecycle, and the stdio transport.

pub mod rpc;
pub mod server;
pub mod session;
pub mod stdio;
pub mod transport;
