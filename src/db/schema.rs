//! Schema introspection module.
//!
//! Reads column, index and foreign-key metadata from `information_schema`.
//! Every query binds the schema and table names as parameters. A table that
//! does not exist simply matches no rows, so callers get empty results rather
//! than errors.
//!
//! Row-to-descriptor conversion is kept separate from the queries so it can be
//! tested without a server.

use crate::db::session::Session;
use crate::error::DbResult;
use crate::models::{
    ColumnDescriptor, ColumnKey, ForeignKeyColumn, ForeignKeyDescriptor, IndexColumn,
    IndexDescriptor, JsonRow, TableIndexes,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Describe the columns of `schema.table` in declared order.
    pub async fn describe_columns<S: Session>(
        session: &mut S,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let rows = session
            .fetch_rows(queries::DESCRIBE_COLUMNS, &[schema, table])
            .await?;
        let columns = columns_from_rows(&rows);
        debug!(schema, table, count = columns.len(), "Described MySQL columns");
        Ok(columns)
    }

    /// Describe the indexes and foreign keys (both directions) of `schema.table`.
    pub async fn describe_indexes<S: Session>(
        session: &mut S,
        schema: &str,
        table: &str,
    ) -> DbResult<TableIndexes> {
        let index_rows = session
            .fetch_rows(queries::DESCRIBE_INDEXES, &[schema, table])
            .await?;
        let outbound_rows = session
            .fetch_rows(queries::OUTBOUND_FOREIGN_KEYS, &[schema, table])
            .await?;
        let inbound_rows = session
            .fetch_rows(queries::INBOUND_FOREIGN_KEYS, &[schema, table])
            .await?;

        let result = TableIndexes {
            indexes: indexes_from_rows(&index_rows),
            foreign_keys_outbound: foreign_keys_from_rows(&outbound_rows),
            foreign_keys_inbound: foreign_keys_from_rows(&inbound_rows),
        };

        debug!(
            schema,
            table,
            indexes = result.indexes.len(),
            outbound = result.foreign_keys_outbound.len(),
            inbound = result.foreign_keys_inbound.len(),
            "Described MySQL indexes and foreign keys"
        );
        Ok(result)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Text columns are converted explicitly because MySQL may report
// information_schema strings as VARBINARY depending on the server charset.

pub mod queries {
    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(DATA_TYPE USING utf8mb4) AS DATA_TYPE,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(EXTRA USING utf8mb4) AS EXTRA,
            CHARACTER_MAXIMUM_LENGTH AS CHARACTER_MAXIMUM_LENGTH,
            CONVERT(COLUMN_COMMENT USING utf8mb4) AS COLUMN_COMMENT
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;

    pub const DESCRIBE_INDEXES: &str = r#"
        SELECT
            CONVERT(INDEX_NAME USING utf8mb4) AS INDEX_NAME,
            NON_UNIQUE AS NON_UNIQUE,
            SEQ_IN_INDEX AS SEQ_IN_INDEX,
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(INDEX_TYPE USING utf8mb4) AS INDEX_TYPE
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

    pub const OUTBOUND_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
            CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_SCHEMA USING utf8mb4) AS REFERENCED_TABLE_SCHEMA,
            CONVERT(REFERENCED_TABLE_NAME USING utf8mb4) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8mb4) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = ?
        AND TABLE_NAME = ?
        AND REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;

    pub const INBOUND_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
            CONVERT(TABLE_SCHEMA USING utf8mb4) AS TABLE_SCHEMA,
            CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME,
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_SCHEMA USING utf8mb4) AS REFERENCED_TABLE_SCHEMA,
            CONVERT(REFERENCED_TABLE_NAME USING utf8mb4) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8mb4) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE REFERENCED_TABLE_SCHEMA = ?
        AND REFERENCED_TABLE_NAME = ?
        ORDER BY TABLE_SCHEMA, TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
}

// =============================================================================
// Row Accessors
// =============================================================================

/// Get a string value; NULL and missing columns become "".
fn get_string(row: &JsonRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

/// Get a string value; NULL and missing columns become None.
fn get_optional_string(row: &JsonRow, column: &str) -> Option<String> {
    match row.get(column)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Get a non-empty string value.
fn get_non_empty_string(row: &JsonRow, column: &str) -> Option<String> {
    get_optional_string(row, column).filter(|s| !s.is_empty())
}

/// Get an unsigned integer, accepting numbers or numeric strings.
fn get_u64(row: &JsonRow, column: &str) -> Option<u64> {
    match row.get(column)? {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

// =============================================================================
// Row Conversion
// =============================================================================

/// Convert `DESCRIBE_COLUMNS` rows into descriptors, keeping row order.
pub fn columns_from_rows(rows: &[JsonRow]) -> Vec<ColumnDescriptor> {
    rows.iter()
        .map(|row| {
            let nullable = get_string(row, "IS_NULLABLE").eq_ignore_ascii_case("YES");
            let mut col = ColumnDescriptor::new(
                get_string(row, "COLUMN_NAME"),
                get_string(row, "DATA_TYPE"),
                get_string(row, "COLUMN_TYPE"),
                nullable,
            )
            .with_key(ColumnKey::parse(&get_string(row, "COLUMN_KEY")));

            if let Some(default) = get_optional_string(row, "COLUMN_DEFAULT") {
                col = col.with_default(default);
            }
            if let Some(extra) = get_non_empty_string(row, "EXTRA") {
                col = col.with_extra(extra);
            }
            if let Some(length) = get_u64(row, "CHARACTER_MAXIMUM_LENGTH") {
                col = col.with_length(length);
            }
            if let Some(comment) = get_non_empty_string(row, "COLUMN_COMMENT") {
                col = col.with_comment(comment);
            }
            col
        })
        .collect()
}

/// Group `DESCRIBE_INDEXES` rows (one per key part) into index descriptors.
///
/// Indexes appear in the order of their first row; columns keep row order.
pub fn indexes_from_rows(rows: &[JsonRow]) -> Vec<IndexDescriptor> {
    let mut indexes: Vec<IndexDescriptor> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let name = get_non_empty_string(row, "INDEX_NAME").unwrap_or_else(|| "(unnamed)".into());
        let pos = *positions.entry(name.clone()).or_insert_with(|| {
            let is_unique = get_u64(row, "NON_UNIQUE") == Some(0);
            let mut index = IndexDescriptor::new(&name, is_unique);
            if let Some(index_type) = get_non_empty_string(row, "INDEX_TYPE") {
                index = index.with_index_type(index_type);
            }
            indexes.push(index);
            indexes.len() - 1
        });

        indexes[pos].columns.push(IndexColumn {
            name: get_optional_string(row, "COLUMN_NAME"),
            seq_in_index: get_u64(row, "SEQ_IN_INDEX").unwrap_or(0),
        });
    }

    indexes
}

/// Group `KEY_COLUMN_USAGE` rows (one per column pair) into foreign keys.
///
/// Constraint names are unique per schema, so rows are grouped by source
/// schema, source table and constraint name.
pub fn foreign_keys_from_rows(rows: &[JsonRow]) -> Vec<ForeignKeyDescriptor> {
    let mut keys: Vec<ForeignKeyDescriptor> = Vec::new();
    let mut positions: HashMap<(String, String, String), usize> = HashMap::new();

    for row in rows {
        let name = get_string(row, "CONSTRAINT_NAME");
        let source_schema = get_string(row, "TABLE_SCHEMA");
        let source_table = get_string(row, "TABLE_NAME");
        let group = (source_schema.clone(), source_table.clone(), name.clone());

        let pos = *positions.entry(group).or_insert_with(|| {
            keys.push(ForeignKeyDescriptor {
                name,
                source_schema,
                source_table,
                target_schema: get_string(row, "REFERENCED_TABLE_SCHEMA"),
                target_table: get_string(row, "REFERENCED_TABLE_NAME"),
                columns: Vec::new(),
            });
            keys.len() - 1
        });

        keys[pos].columns.push(ForeignKeyColumn {
            column: get_string(row, "COLUMN_NAME"),
            references: get_string(row, "REFERENCED_COLUMN_NAME"),
        });
    }

    keys
}
