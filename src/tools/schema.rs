//! Schema introspection tools.
//!
//! This module implements the `describe_table` and
//! `describe_indexes_and_foreign_keys` MCP tools. A table that does not exist
//! yields empty results, not an error.

use crate::db::schema::SchemaInspector;
use crate::db::{Session, SessionProvider};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableIndexes};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Schema (database) containing the table
    pub schema: String,
    /// Table name
    #[serde(alias = "table_name")]
    pub table: String,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub schema: String,
    pub table: String,
    /// Columns in declared order; empty when the table does not exist
    pub columns: Vec<ColumnDescriptor>,
    pub count: usize,
}

/// Input for the describe_indexes_and_foreign_keys tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeIndexesInput {
    /// Schema (database) containing the table
    pub schema: String,
    /// Table name
    #[serde(alias = "table_name")]
    pub table: String,
}

/// Output from the describe_indexes_and_foreign_keys tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeIndexesOutput {
    pub schema: String,
    pub table: String,
    pub indexes: Vec<IndexDescriptor>,
    /// Foreign keys declared on this table
    pub foreign_keys_outbound: Vec<ForeignKeyDescriptor>,
    /// Foreign keys on other tables that reference this table
    pub foreign_keys_inbound: Vec<ForeignKeyDescriptor>,
}

impl DescribeIndexesOutput {
    fn new(schema: String, table: String, found: TableIndexes) -> Self {
        Self {
            schema,
            table,
            indexes: found.indexes,
            foreign_keys_outbound: found.foreign_keys_outbound,
            foreign_keys_inbound: found.foreign_keys_inbound,
        }
    }
}

/// Handler for schema introspection tools.
pub struct SchemaToolHandler<P> {
    provider: Arc<P>,
}

impl<P: SessionProvider> SchemaToolHandler<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Handle the describe_table tool call.
    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let mut session = self.provider.open().await?;
        let result =
            SchemaInspector::describe_columns(&mut session, &input.schema, &input.table).await;
        session.close().await;
        let columns = result?;

        info!(
            schema = %input.schema,
            table = %input.table,
            column_count = columns.len(),
            "describe_table completed"
        );

        Ok(DescribeTableOutput {
            count: columns.len(),
            schema: input.schema,
            table: input.table,
            columns,
        })
    }

    /// Handle the describe_indexes_and_foreign_keys tool call.
    pub async fn describe_indexes_and_foreign_keys(
        &self,
        input: DescribeIndexesInput,
    ) -> DbResult<DescribeIndexesOutput> {
        let mut session = self.provider.open().await?;
        let result =
            SchemaInspector::describe_indexes(&mut session, &input.schema, &input.table).await;
        session.close().await;
        let found = result?;

        info!(
            schema = %input.schema,
            table = %input.table,
            index_count = found.indexes.len(),
            outbound_fk_count = found.foreign_keys_outbound.len(),
            inbound_fk_count = found.foreign_keys_inbound.len(),
            "describe_indexes_and_foreign_keys completed"
        );

        Ok(DescribeIndexesOutput::new(input.schema, input.table, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_table_input_accepts_table_name_alias() {
        let input: DescribeTableInput =
            serde_json::from_value(json!({"schema": "shop", "table_name": "orders"})).unwrap();
        assert_eq!(input.table, "orders");

        let input: DescribeIndexesInput =
            serde_json::from_value(json!({"schema": "shop", "table": "orders"})).unwrap();
        assert_eq!(input.table, "orders");
    }

    #[test]
    fn test_describe_table_input_requires_schema() {
        let result: Result<DescribeTableInput, _> =
            serde_json::from_value(json!({"table": "orders"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_indexes_output_shape() {
        let output =
            DescribeIndexesOutput::new("shop".into(), "missing".into(), TableIndexes::default());
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["indexes"], json!([]));
        assert_eq!(value["foreign_keys_outbound"], json!([]));
        assert_eq!(value["foreign_keys_inbound"], json!([]));
        assert_eq!(value["table"], "missing");
    }
}
