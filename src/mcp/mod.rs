//! MCP server integration module.
//!
//! Binds the tool handlers to the MCP protocol using the rmcp framework.

pub mod service;

pub use service::MySqlService;
