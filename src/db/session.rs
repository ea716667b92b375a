//! Database sessions.
//!
//! A [`Session`] is one live, authenticated connection scoped to a single tool
//! invocation. A [`SessionProvider`] opens sessions from the connection
//! parameters captured at startup. Handlers only see these two traits, so they
//! can be exercised with in-memory sessions in tests.
//!
//! The MySQL implementation opens a fresh `MySqlConnection` per call; there is
//! no pool.

use crate::config::ConnectionParams;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{JsonRow, StatementOutcome};
use crate::tools::sql_validator;
use futures_util::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Column, ConnectOptions, Connection, Either, Executor, Statement};
use std::future::Future;
use tracing::{debug, warn};

/// A connected database session.
pub trait Session: Send + Sized {
    /// Execute SQL text verbatim and report what it produced.
    fn execute(&mut self, sql: &str) -> impl Future<Output = DbResult<StatementOutcome>> + Send;

    /// Run a parameterized query, binding each parameter as a string.
    fn fetch_rows(
        &mut self,
        sql: &str,
        params: &[&str],
    ) -> impl Future<Output = DbResult<Vec<JsonRow>>> + Send;

    /// Close the session. Failures are logged, never returned.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens sessions against the configured database.
pub trait SessionProvider: Send + Sync {
    type Session: Session;

    /// Open a new session. Every failure here is a connection error.
    fn open(&self) -> impl Future<Output = DbResult<Self::Session>> + Send;
}

/// Session provider backed by a fresh MySQL connection per call.
#[derive(Clone)]
pub struct MySqlSessionProvider {
    options: MySqlConnectOptions,
    target: String,
}

impl MySqlSessionProvider {
    /// Create a provider from the startup connection parameters.
    pub fn new(params: &ConnectionParams) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database)
            .charset(&params.charset);

        Self {
            options,
            target: params.display_target(),
        }
    }

    /// Connection target without credentials, for logging.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl std::fmt::Debug for MySqlSessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSessionProvider")
            .field("target", &self.target)
            .finish()
    }
}

impl SessionProvider for MySqlSessionProvider {
    type Session = MySqlSession;

    async fn open(&self) -> DbResult<MySqlSession> {
        debug!(target_db = %self.target, "Opening MySQL session");
        let conn = self
            .options
            .connect()
            .await
            .map_err(DbError::connect_failed)?;
        Ok(MySqlSession { conn })
    }
}

/// Accumulates the results of every statement in one `execute` call.
///
/// Rows from all result sets are kept in order under the first set's column
/// names. `rows_affected` is summed; `last_insert_id` keeps the last non-zero
/// value the server reported.
#[derive(Debug, Default)]
struct ResultCollector {
    columns: Option<Vec<String>>,
    rows: Vec<JsonRow>,
    rows_affected: u64,
    last_insert_id: Option<u64>,
}

impl ResultCollector {
    fn statement_done(&mut self, rows_affected: u64, last_insert_id: u64) {
        self.rows_affected += rows_affected;
        if last_insert_id != 0 {
            self.last_insert_id = Some(last_insert_id);
        }
    }

    fn row(&mut self, columns: impl FnOnce() -> Vec<String>, row: JsonRow) {
        if self.columns.is_none() {
            self.columns = Some(columns());
        }
        self.rows.push(row);
    }

    fn has_result_set(&self) -> bool {
        self.columns.is_some()
    }

    /// Final outcome. `empty_set_columns` describes a row-returning statement
    /// that produced no rows; it is ignored once any row was seen.
    fn finish(self, empty_set_columns: Option<Vec<String>>) -> StatementOutcome {
        match self.columns.or(empty_set_columns) {
            Some(columns) => StatementOutcome::rows(columns, self.rows),
            None => StatementOutcome::command(self.rows_affected, self.last_insert_id),
        }
    }
}

/// A single MySQL connection.
#[derive(Debug)]
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl MySqlSession {
    /// Column names of a row-returning statement that produced no rows.
    ///
    /// Preparing the statement is the only way to learn its columns without
    /// rows; statements MySQL cannot prepare yield no columns.
    async fn describe_columns(&mut self, sql: &str) -> Vec<String> {
        match (&mut self.conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not prepare statement to read its columns");
                Vec::new()
            }
        }
    }
}

impl Session for MySqlSession {
    async fn execute(&mut self, sql: &str) -> DbResult<StatementOutcome> {
        let mut collected = ResultCollector::default();

        {
            let mut results = sqlx::raw_sql(sql).fetch_many(&mut self.conn);
            while let Some(item) = results.try_next().await? {
                match item {
                    Either::Left(done) => {
                        collected.statement_done(done.rows_affected(), done.last_insert_id())
                    }
                    Either::Right(row) => collected.row(|| row.column_names(), row.to_json_map()),
                }
            }
        }

        if collected.has_result_set() || !sql_validator::returns_rows(sql) {
            return Ok(collected.finish(None));
        }
        let columns = self.describe_columns(sql).await;
        Ok(collected.finish(Some(columns)))
    }

    async fn fetch_rows(&mut self, sql: &str, params: &[&str]) -> DbResult<Vec<JsonRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query.fetch_all(&mut self.conn).await?;
        Ok(rows.iter().map(RowToJson::to_json_map).collect())
    }

    async fn close(self) {
        if let Err(e) = self.conn.close().await {
            warn!(error = %e, "Failed to close MySQL session cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_target_has_no_password() {
        let params = ConnectionParams::new("localhost", 3306, "root", "s3cret", "shop").unwrap();
        let provider = MySqlSessionProvider::new(&params);
        assert_eq!(provider.target(), "root@localhost:3306/shop");
        assert!(!format!("{:?}", provider).contains("s3cret"));
    }

    fn one_value(column: &str, value: i64) -> JsonRow {
        let mut row = JsonRow::new();
        row.insert(column.to_string(), value.into());
        row
    }

    #[test]
    fn test_collector_sums_rows_affected_and_keeps_last_insert_id() {
        let mut collected = ResultCollector::default();
        collected.statement_done(1, 41);
        collected.statement_done(1, 42);
        assert_eq!(collected.finish(None), StatementOutcome::command(2, Some(42)));
    }

    #[test]
    fn test_collector_ignores_zero_insert_id_from_later_statement() {
        let mut collected = ResultCollector::default();
        collected.statement_done(3, 17);
        collected.statement_done(1, 0);
        assert_eq!(collected.finish(None), StatementOutcome::command(4, Some(17)));
    }

    #[test]
    fn test_collector_without_anything_is_empty_command() {
        let collected = ResultCollector::default();
        assert!(!collected.has_result_set());
        assert_eq!(collected.finish(None), StatementOutcome::command(0, None));
    }

    #[test]
    fn test_collector_rows_after_update_win_over_command() {
        let mut collected = ResultCollector::default();
        collected.statement_done(5, 0);
        collected.row(|| vec!["n".to_string()], one_value("n", 5));
        collected.statement_done(0, 0);
        assert!(collected.has_result_set());
        assert_eq!(
            collected.finish(None),
            StatementOutcome::rows(vec!["n".to_string()], vec![one_value("n", 5)])
        );
    }

    #[test]
    fn test_collector_keeps_first_result_set_columns() {
        let mut collected = ResultCollector::default();
        collected.row(|| vec!["a".to_string()], one_value("a", 1));
        collected.statement_done(0, 0);
        collected.row(|| panic!("columns are read once"), one_value("b", 2));
        collected.statement_done(0, 0);
        assert_eq!(
            collected.finish(Some(vec!["ignored".to_string()])),
            StatementOutcome::rows(
                vec!["a".to_string()],
                vec![one_value("a", 1), one_value("b", 2)]
            )
        );
    }

    #[test]
    fn test_collector_empty_result_set_uses_described_columns() {
        let mut collected = ResultCollector::default();
        collected.statement_done(0, 0);
        assert_eq!(
            collected.finish(Some(vec!["id".to_string(), "total".to_string()])),
            StatementOutcome::rows(vec!["id".to_string(), "total".to_string()], Vec::new())
        );
    }

    #[tokio::test]
    async fn test_open_unreachable_server_is_connection_error() {
        // Port 1 on localhost is never a MySQL server.
        let params = ConnectionParams::new("127.0.0.1", 1, "root", "pw", "shop").unwrap();
        let provider = MySqlSessionProvider::new(&params);
        let err = provider.open().await.unwrap_err();
        assert!(err.is_connection(), "expected connection error, got {err:?}");
    }
}
