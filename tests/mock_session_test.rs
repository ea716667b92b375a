//! Tool handler tests against an in-memory session provider.
//!
//! The mock records how many sessions were opened and closed so the tests can
//! check that every call releases its session, including on failure.

use mysql_mcp_server::db::schema::queries;
use mysql_mcp_server::db::{Session, SessionProvider};
use mysql_mcp_server::error::{DbError, DbResult};
use mysql_mcp_server::models::{ColumnKey, JsonRow, StatementOutcome};
use mysql_mcp_server::tools::{
    DescribeIndexesInput, DescribeTableInput, OutputFormat, QueryToolHandler, RunQueryInput,
    SchemaToolHandler, StatementPolicy,
};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_test::{assert_err, assert_ok};

// =============================================================================
// Mock provider
// =============================================================================

#[derive(Clone)]
enum Scripted {
    Outcome(StatementOutcome),
    Fails { message: String, sql_state: String },
}

#[derive(Default, Clone)]
struct Catalog {
    columns: Vec<JsonRow>,
    indexes: Vec<JsonRow>,
    outbound: Vec<JsonRow>,
    inbound: Vec<JsonRow>,
}

#[derive(Default)]
struct MockState {
    opens: usize,
    closes: usize,
    executed: Vec<String>,
}

#[derive(Default)]
struct MockProvider {
    unreachable: bool,
    scripts: HashMap<String, Scripted>,
    tables: HashMap<(String, String), Catalog>,
    state: Arc<Mutex<MockState>>,
}

struct MockSession {
    scripts: HashMap<String, Scripted>,
    tables: HashMap<(String, String), Catalog>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn script(mut self, sql: &str, response: Scripted) -> Self {
        self.scripts.insert(sql.to_string(), response);
        self
    }

    fn table(mut self, schema: &str, table: &str, catalog: Catalog) -> Self {
        self.tables
            .insert((schema.to_string(), table.to_string()), catalog);
        self
    }

    fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }
}

impl SessionProvider for MockProvider {
    type Session = MockSession;

    async fn open(&self) -> DbResult<MockSession> {
        if self.unreachable {
            return Err(DbError::connection(
                "I/O error: Connection refused (os error 111)",
                "Check MYSQL_HOST, MYSQL_PORT and that the server is running",
            ));
        }
        self.state.lock().unwrap().opens += 1;
        Ok(MockSession {
            scripts: self.scripts.clone(),
            tables: self.tables.clone(),
            state: self.state.clone(),
        })
    }
}

impl Session for MockSession {
    async fn execute(&mut self, sql: &str) -> DbResult<StatementOutcome> {
        self.state.lock().unwrap().executed.push(sql.to_string());
        match self.scripts.get(sql) {
            Some(Scripted::Outcome(outcome)) => Ok(outcome.clone()),
            Some(Scripted::Fails { message, sql_state }) => Err(DbError::database(
                message.clone(),
                Some(sql_state.clone()),
                "Check the SQL syntax and referenced objects",
            )),
            None => Ok(StatementOutcome::command(0, None)),
        }
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[&str]) -> DbResult<Vec<JsonRow>> {
        let key = (params[0].to_string(), params[1].to_string());
        let catalog = self.tables.get(&key).cloned().unwrap_or_default();
        let rows = if sql == queries::DESCRIBE_COLUMNS {
            catalog.columns
        } else if sql == queries::DESCRIBE_INDEXES {
            catalog.indexes
        } else if sql == queries::OUTBOUND_FOREIGN_KEYS {
            catalog.outbound
        } else if sql == queries::INBOUND_FOREIGN_KEYS {
            catalog.inbound
        } else {
            return Err(DbError::internal(format!("unexpected metadata query: {sql}")));
        };
        Ok(rows)
    }

    async fn close(self) {
        self.state.lock().unwrap().closes += 1;
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn row(value: JsonValue) -> JsonRow {
    value.as_object().cloned().expect("fixture rows are objects")
}

fn fk_row(name: &str, from: (&str, &str, &str), to: (&str, &str, &str)) -> JsonRow {
    row(json!({
        "CONSTRAINT_NAME": name,
        "TABLE_SCHEMA": from.0, "TABLE_NAME": from.1, "COLUMN_NAME": from.2,
        "REFERENCED_TABLE_SCHEMA": to.0, "REFERENCED_TABLE_NAME": to.1, "REFERENCED_COLUMN_NAME": to.2,
    }))
}

fn id_column() -> JsonRow {
    row(json!({
        "COLUMN_NAME": "id", "DATA_TYPE": "int", "COLUMN_TYPE": "int",
        "IS_NULLABLE": "NO", "COLUMN_KEY": "PRI", "COLUMN_DEFAULT": null,
        "EXTRA": "auto_increment", "CHARACTER_MAXIMUM_LENGTH": null, "COLUMN_COMMENT": ""
    }))
}

fn total_column() -> JsonRow {
    row(json!({
        "COLUMN_NAME": "total", "DATA_TYPE": "decimal", "COLUMN_TYPE": "decimal(10,2)",
        "IS_NULLABLE": "YES", "COLUMN_KEY": "", "COLUMN_DEFAULT": null,
        "EXTRA": "", "CHARACTER_MAXIMUM_LENGTH": null, "COLUMN_COMMENT": ""
    }))
}

/// `shop.orders (id INT PK, total DECIMAL)` and nothing else.
fn bare_orders() -> MockProvider {
    MockProvider::default().table(
        "shop",
        "orders",
        Catalog {
            columns: vec![id_column(), total_column()],
            ..Catalog::default()
        },
    )
}

/// `shop.orders (id, total, customer_id)` with an FK to customers and one from order_lines.
fn shop() -> MockProvider {
    let orders = Catalog {
        columns: vec![
            id_column(),
            total_column(),
            row(json!({
                "COLUMN_NAME": "customer_id", "DATA_TYPE": "int", "COLUMN_TYPE": "int",
                "IS_NULLABLE": "NO", "COLUMN_KEY": "MUL", "COLUMN_DEFAULT": null,
                "EXTRA": "", "CHARACTER_MAXIMUM_LENGTH": null, "COLUMN_COMMENT": ""
            })),
        ],
        indexes: vec![
            row(json!({"INDEX_NAME": "PRIMARY", "NON_UNIQUE": 0, "SEQ_IN_INDEX": 1, "COLUMN_NAME": "id", "INDEX_TYPE": "BTREE"})),
            row(json!({"INDEX_NAME": "fk_orders_customer", "NON_UNIQUE": 1, "SEQ_IN_INDEX": 1, "COLUMN_NAME": "customer_id", "INDEX_TYPE": "BTREE"})),
        ],
        outbound: vec![fk_row(
            "fk_orders_customer",
            ("shop", "orders", "customer_id"),
            ("shop", "customers", "id"),
        )],
        inbound: vec![fk_row(
            "fk_lines_order",
            ("shop", "order_lines", "order_id"),
            ("shop", "orders", "id"),
        )],
    };

    MockProvider::default()
        .table("shop", "orders", orders)
        .script(
            "SELECT 1",
            Scripted::Outcome(StatementOutcome::rows(
                vec!["1".to_string()],
                vec![row(json!({"1": 1}))],
            )),
        )
        .script(
            "UPDATE shop.orders SET total = 0 WHERE id IN (1, 2)",
            Scripted::Outcome(StatementOutcome::command(2, None)),
        )
        .script(
            "SELEC 1",
            Scripted::Fails {
                message: "You have an error in your SQL syntax".to_string(),
                sql_state: "42000".to_string(),
            },
        )
}

fn describe(schema: &str, table: &str) -> DescribeTableInput {
    DescribeTableInput {
        schema: schema.to_string(),
        table: table.to_string(),
    }
}

fn describe_indexes(schema: &str, table: &str) -> DescribeIndexesInput {
    DescribeIndexesInput {
        schema: schema.to_string(),
        table: table.to_string(),
    }
}

fn sql(text: &str) -> RunQueryInput {
    RunQueryInput {
        sql: text.to_string(),
        format: OutputFormat::Json,
    }
}

// =============================================================================
// run_query
// =============================================================================

#[tokio::test]
async fn test_select_one_returns_single_value() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());

    let output = assert_ok!(handler.run_query(sql("SELECT 1")).await);
    assert_eq!(output.columns, Some(vec!["1".to_string()]));
    let rows = output.rows.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["1"], json!(1));
    assert_eq!(output.row_count, 1);
    assert_eq!(output.success, None);
}

#[tokio::test]
async fn test_command_reports_rows_affected() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());

    let output = assert_ok!(
        handler
            .run_query(sql("UPDATE shop.orders SET total = 0 WHERE id IN (1, 2)"))
            .await
    );
    assert_eq!(output.success, Some(true));
    assert_eq!(output.rows_affected, Some(2));
    assert!(output.rows.is_none());
}

#[tokio::test]
async fn test_sql_is_forwarded_verbatim() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());
    let text = "  select /* keep me */ 1 ;\n";

    assert_ok!(handler.run_query(sql(text)).await);
    assert_eq!(provider.executed(), vec![text.to_string()]);
}

#[tokio::test]
async fn test_statement_failure_is_database_error_and_session_closed() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());

    let err = assert_err!(handler.run_query(sql("SELEC 1")).await);
    match &err {
        DbError::Database { sql_state, .. } => assert_eq!(sql_state.as_deref(), Some("42000")),
        other => panic!("expected database error, got {other:?}"),
    }
    assert_eq!(provider.opens(), 1);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_table_format_fills_formatted() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());

    let output = assert_ok!(
        handler
            .run_query(RunQueryInput {
                sql: "SELECT 1".to_string(),
                format: OutputFormat::Table,
            })
            .await
    );
    assert!(output.rows.is_none());
    let table = output.formatted.unwrap();
    assert!(table.contains("| 1 |"));
    assert!(table.contains("1 row in set"));
}

#[tokio::test]
async fn test_empty_sql_rejected_without_opening_session() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::new(provider.clone());

    let err = assert_err!(handler.run_query(sql("   ")).await);
    assert!(matches!(err, DbError::InvalidInput { .. }));
    assert_eq!(provider.opens(), 0);
}

#[tokio::test]
async fn test_read_only_policy_blocks_writes_and_allows_reads() {
    let provider = Arc::new(shop());
    let handler = QueryToolHandler::with_policy(provider.clone(), StatementPolicy::ReadOnly);

    let err = assert_err!(
        handler
            .run_query(sql("UPDATE shop.orders SET total = 0 WHERE id IN (1, 2)"))
            .await
    );
    assert!(matches!(err, DbError::Permission { .. }));
    assert_eq!(provider.opens(), 0);

    assert_ok!(handler.run_query(sql("SELECT 1")).await);
    assert_eq!(provider.opens(), 1);
}

// =============================================================================
// describe_table
// =============================================================================

#[tokio::test]
async fn test_describe_orders_in_declared_order() {
    let provider = Arc::new(shop());
    let handler = SchemaToolHandler::new(provider.clone());

    let output = assert_ok!(handler.describe_table(describe("shop", "orders")).await);
    assert_eq!(output.count, 3);
    let names: Vec<_> = output.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "total", "customer_id"]);

    let id = &output.columns[0];
    assert!(id.is_primary_key);
    assert!(!id.nullable);
    assert_eq!(id.key, Some(ColumnKey::Primary));

    let total = &output.columns[1];
    assert!(!total.is_primary_key);
    assert!(total.nullable);
    assert_eq!(total.column_type, "decimal(10,2)");

    assert_eq!(output.columns[2].key, Some(ColumnKey::Multiple));
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_describe_two_column_orders() {
    let provider = Arc::new(bare_orders());
    let handler = SchemaToolHandler::new(provider.clone());

    let output = assert_ok!(handler.describe_table(describe("shop", "orders")).await);
    assert_eq!(output.count, 2);
    assert_eq!(output.columns.len(), 2);

    let id = &output.columns[0];
    assert_eq!(id.name, "id");
    assert!(id.is_primary_key);
    assert!(!id.nullable);
    assert_eq!(id.key, Some(ColumnKey::Primary));

    let total = &output.columns[1];
    assert_eq!(total.name, "total");
    assert_eq!(total.data_type, "decimal");
    assert!(!total.is_primary_key);
    assert!(total.nullable);
    assert_eq!(total.key, None);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_describe_missing_table_is_empty() {
    let provider = Arc::new(shop());
    let handler = SchemaToolHandler::new(provider.clone());

    let output = assert_ok!(handler.describe_table(describe("shop", "nope")).await);
    assert!(output.columns.is_empty());
    assert_eq!(output.count, 0);

    let output = assert_ok!(handler.describe_table(describe("no_such_schema", "orders")).await);
    assert!(output.columns.is_empty());
}

#[tokio::test]
async fn test_describe_table_is_idempotent() {
    let provider = Arc::new(shop());
    let handler = SchemaToolHandler::new(provider.clone());

    let first = assert_ok!(handler.describe_table(describe("shop", "orders")).await);
    let second = assert_ok!(handler.describe_table(describe("shop", "orders")).await);
    assert_eq!(first.columns, second.columns);
    assert_eq!(provider.opens(), 2);
    assert_eq!(provider.closes(), 2);
}

// =============================================================================
// describe_indexes_and_foreign_keys
// =============================================================================

#[tokio::test]
async fn test_indexes_and_both_fk_directions() {
    let provider = Arc::new(shop());
    let handler = SchemaToolHandler::new(provider.clone());

    let output = assert_ok!(
        handler
            .describe_indexes_and_foreign_keys(describe_indexes("shop", "orders"))
            .await
    );
    assert_eq!(output.indexes.len(), 2);
    assert!(output.indexes[0].is_primary);

    assert_eq!(output.foreign_keys_outbound.len(), 1);
    assert_eq!(output.foreign_keys_outbound[0].target_table, "customers");

    assert_eq!(output.foreign_keys_inbound.len(), 1);
    let inbound = &output.foreign_keys_inbound[0];
    assert_eq!(inbound.source_table, "order_lines");
    assert_eq!(inbound.target_table, "orders");
    assert_eq!(inbound.columns[0].references, "id");

    assert_eq!(provider.opens(), 1);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_indexes_for_missing_table_are_empty() {
    let provider = Arc::new(shop());
    let handler = SchemaToolHandler::new(provider.clone());

    let output = assert_ok!(
        handler
            .describe_indexes_and_foreign_keys(describe_indexes("shop", "nope"))
            .await
    );
    assert!(output.indexes.is_empty());
    assert!(output.foreign_keys_outbound.is_empty());
    assert!(output.foreign_keys_inbound.is_empty());
}

// =============================================================================
// Connection failure
// =============================================================================

#[tokio::test]
async fn test_connection_failure_from_every_tool() {
    let provider = Arc::new(MockProvider::unreachable());
    let query = QueryToolHandler::new(provider.clone());
    let schema = SchemaToolHandler::new(provider.clone());

    let err = assert_err!(query.run_query(sql("SELECT 1")).await);
    assert!(err.is_connection());

    let err = assert_err!(schema.describe_table(describe("shop", "orders")).await);
    assert!(err.is_connection());

    let err = assert_err!(
        schema
            .describe_indexes_and_foreign_keys(describe_indexes("shop", "orders"))
            .await
    );
    assert!(err.is_connection());

    let mcp_err: rmcp::ErrorData = err.into();
    assert_eq!(mcp_err.code.0, -32603);
}
