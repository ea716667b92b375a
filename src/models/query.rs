//! Query-related data models.
//!
//! This module defines the result of executing a statement verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A result row: column name to JSON value.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementOutcome {
    /// The statement returned a result set (possibly empty).
    Rows {
        /// Column names in result-set order
        columns: Vec<String>,
        rows: Vec<JsonRow>,
    },
    /// The statement returned no result set.
    Command {
        rows_affected: u64,
        /// Only set when the statement generated an AUTO_INCREMENT value
        last_insert_id: Option<u64>,
    },
}

impl StatementOutcome {
    /// Build a row outcome.
    pub fn rows(columns: Vec<String>, rows: Vec<JsonRow>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Build a command outcome.
    pub fn command(rows_affected: u64, last_insert_id: Option<u64>) -> Self {
        Self::Command {
            rows_affected,
            last_insert_id,
        }
    }

    /// Number of rows in the result set, or 0 for commands.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows { rows, .. } => rows.len(),
            Self::Command { .. } => 0,
        }
    }

    /// True if the statement produced a result set.
    pub fn has_result_set(&self) -> bool {
        matches!(self, Self::Rows { .. })
    }
}
