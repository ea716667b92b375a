//! Query execution tool.
//!
//! This module implements the `run_query` MCP tool. SQL is sent verbatim over
//! the text protocol on a session opened for this call only; the configured
//! [`StatementPolicy`] is the only gate in front of the server.

use crate::db::{Session, SessionProvider};
use crate::error::DbResult;
use crate::models::{JsonRow, StatementOutcome};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table, format_command};
use crate::tools::sql_validator::StatementPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Input for the run_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunQueryInput {
    /// SQL to execute verbatim. Multiple statements separated by `;` are allowed.
    pub sql: String,
    /// Output format: "json" returns structured rows, "table" an ASCII table, "markdown" a markdown table
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output from the run_query tool.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct RunQueryOutput {
    /// Set for statements that return no result set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Column names in result-set order. Omitted for table/markdown output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Result rows as column-name to value maps. Omitted for table/markdown output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<JsonRow>>,
    /// Rows changed by statements without a result set, summed across statements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    /// Last AUTO_INCREMENT value generated, when non-zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<u64>,
    /// Rendered output when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// Number of rows returned
    pub row_count: usize,
    /// Statement execution time in milliseconds
    pub execution_time_ms: u64,
}

impl RunQueryOutput {
    /// Build the tool output from a statement outcome.
    pub fn from_outcome(
        outcome: StatementOutcome,
        format: OutputFormat,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = outcome.row_count();
        match outcome {
            StatementOutcome::Rows { columns, rows } => {
                let formatted = match format {
                    OutputFormat::Json => None,
                    OutputFormat::Table => {
                        Some(format_as_table(&columns, &rows, execution_time_ms))
                    }
                    OutputFormat::Markdown => Some(format_as_markdown(&columns, &rows)),
                };
                let (columns, rows) = if formatted.is_some() {
                    (None, None)
                } else {
                    (Some(columns), Some(rows))
                };
                Self {
                    columns,
                    rows,
                    formatted,
                    row_count,
                    execution_time_ms,
                    ..Self::default()
                }
            }
            StatementOutcome::Command {
                rows_affected,
                last_insert_id,
            } => Self {
                success: Some(true),
                rows_affected: Some(rows_affected),
                last_insert_id,
                formatted: match format {
                    OutputFormat::Json => None,
                    _ => Some(format_command(rows_affected, execution_time_ms)),
                },
                row_count,
                execution_time_ms,
                ..Self::default()
            },
        }
    }
}

/// Handler for the run_query tool.
pub struct QueryToolHandler<P> {
    provider: Arc<P>,
    policy: StatementPolicy,
}

impl<P: SessionProvider> QueryToolHandler<P> {
    /// Create a handler that forwards any SQL.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_policy(provider, StatementPolicy::default())
    }

    /// Create a handler that checks SQL against `policy` first.
    pub fn with_policy(provider: Arc<P>, policy: StatementPolicy) -> Self {
        Self { provider, policy }
    }

    /// Handle the run_query tool call.
    ///
    /// The session is closed before any statement error is returned.
    pub async fn run_query(&self, input: RunQueryInput) -> DbResult<RunQueryOutput> {
        self.policy.check(&input.sql)?;
        debug!(sql = %input.sql, policy = %self.policy, "Executing run_query");

        let mut session = self.provider.open().await?;
        let start = Instant::now();
        let result = session.execute(&input.sql).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;
        session.close().await;
        let outcome = result?;

        info!(
            result_set = outcome.has_result_set(),
            row_count = outcome.row_count(),
            execution_time_ms,
            "run_query completed"
        );

        Ok(RunQueryOutput::from_outcome(
            outcome,
            input.format,
            execution_time_ms,
        ))
    }
}
