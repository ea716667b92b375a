//! Transport layer for the MCP server.
//!
//! The server is launched by its host client and talks MCP over stdio.

pub mod stdio;

pub use stdio::StdioTransport;
