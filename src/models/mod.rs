//! Data models for the MySQL MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

pub use query::{JsonRow, StatementOutcome};
pub use schema::{
    ColumnDescriptor, ColumnKey, ForeignKeyColumn, ForeignKeyDescriptor, IndexColumn,
    IndexDescriptor, TableIndexes,
};
