//! MCP tool implementations.
//!
//! - `query`: `run_query`, verbatim SQL execution
//! - `schema`: `describe_table` and `describe_indexes_and_foreign_keys`
//! - `sql_validator`: statement classification and the statement policy
//! - `format`: table and markdown renderings of result sets

pub mod format;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use format::OutputFormat;
pub use query::{QueryToolHandler, RunQueryInput, RunQueryOutput};
pub use schema::{
    DescribeIndexesInput, DescribeIndexesOutput, DescribeTableInput, DescribeTableOutput,
    SchemaToolHandler,
};
pub use sql_validator::StatementPolicy;
