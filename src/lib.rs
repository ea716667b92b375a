//! MySQL MCP Server Library
//!
//! MCP (Model Context Protocol) tools that let AI assistants run SQL against a
//! single MySQL database and inspect its tables, indexes and foreign keys.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::MySqlService;
