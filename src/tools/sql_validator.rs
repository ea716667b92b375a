//! SQL statement classification and the `run_query` statement policy.
//!
//! By default `run_query` forwards SQL verbatim. Operators can switch to the
//! read-only policy, which parses the text with the MySQL dialect of
//! [sqlparser](https://docs.rs/sqlparser/) and rejects anything that is not a
//! plain read (SELECT, SHOW, DESCRIBE, EXPLAIN of a read).
//!
//! Classification is also used to tell an empty result set apart from a
//! command that never returns rows.

use crate::error::{DbError, DbResult};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Which statements `run_query` accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatementPolicy {
    /// Any SQL is sent to the server as-is.
    #[default]
    Unrestricted,
    /// Only statements that read data are sent.
    ReadOnly,
}

impl StatementPolicy {
    /// Check `sql` against this policy.
    ///
    /// Blank SQL is rejected under every policy.
    pub fn check(&self, sql: &str) -> DbResult<()> {
        if sql.trim().is_empty() {
            return Err(DbError::invalid_input("SQL must not be empty"));
        }
        match self {
            Self::Unrestricted => Ok(()),
            Self::ReadOnly => validate_readonly(sql),
        }
    }
}

impl std::fmt::Display for StatementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrestricted => write!(f, "unrestricted"),
            Self::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// Type of SQL statement detected by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStatementType {
    /// SELECT, SHOW, DESCRIBE, EXPLAIN
    Select,
    /// INSERT, REPLACE, UPDATE, DELETE
    DmlWrite,
    /// CREATE, DROP, ALTER, TRUNCATE
    Ddl,
    /// START TRANSACTION, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// CALL, PREPARE, EXECUTE
    ProcedureCall,
    /// GRANT, REVOKE, SET, USE, KILL, LOCK, FLUSH
    Administrative,
    Unknown,
}

mod error_messages {
    pub const DML_WRITE: &str = "Data modification is disabled by the read-only statement policy.";
    pub const DDL: &str = "Schema changes are disabled by the read-only statement policy.";
    pub const TRANSACTION: &str =
        "Transaction control is disabled by the read-only statement policy.";
    pub const PROCEDURE: &str =
        "Procedure calls are disabled by the read-only statement policy; their effects cannot be verified.";
    pub const ADMINISTRATIVE: &str =
        "Administrative statements are disabled by the read-only statement policy.";
    pub const UNKNOWN: &str =
        "Unrecognized statement. Only SELECT, SHOW, DESCRIBE and EXPLAIN are allowed under the read-only statement policy.";
    pub const PARSE_ERROR: &str = "Failed to parse SQL statement.";
}

fn parse(sql: &str) -> Result<Vec<Statement>, sqlparser::parser::ParserError> {
    Parser::parse_sql(&MySqlDialect {}, sql)
}

/// Validate that every statement in `sql` only reads data.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::tools::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("SELECT * FROM orders").is_ok());
/// assert!(validate_readonly("DELETE FROM orders").is_err());
/// ```
pub fn validate_readonly(sql: &str) -> DbResult<()> {
    let statements = parse(sql).map_err(|e| {
        DbError::invalid_input(format!("{} Error: {}", error_messages::PARSE_ERROR, e))
    })?;

    if statements.is_empty() {
        return Err(DbError::invalid_input("Empty SQL statement"));
    }

    statements.iter().try_for_each(validate_statement)
}

/// True if the last statement in `sql` produces a result set.
///
/// Unparseable SQL is treated as not returning rows, and so is
/// `SELECT ... INTO`, which stores its result instead of sending it.
pub fn returns_rows(sql: &str) -> bool {
    match parse(sql) {
        Ok(statements) => statements.last().is_some_and(|stmt| {
            classify_statement(stmt).0 == SqlStatementType::Select && !selects_into(stmt)
        }),
        Err(_) => false,
    }
}

fn selects_into(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => {
            matches!(query.body.as_ref(), SetExpr::Select(select) if select.into.is_some())
        }
        _ => false,
    }
}

fn validate_statement(stmt: &Statement) -> DbResult<()> {
    let (stmt_type, operation_name) = classify_statement(stmt);

    let reason = match stmt_type {
        SqlStatementType::Select => return Ok(()),
        SqlStatementType::DmlWrite => error_messages::DML_WRITE,
        SqlStatementType::Ddl => error_messages::DDL,
        SqlStatementType::Transaction => error_messages::TRANSACTION,
        SqlStatementType::ProcedureCall => error_messages::PROCEDURE,
        SqlStatementType::Administrative => error_messages::ADMINISTRATIVE,
        SqlStatementType::Unknown => error_messages::UNKNOWN,
    };
    Err(DbError::permission(operation_name, reason))
}

/// Classify a parsed statement.
pub fn classify_statement(stmt: &Statement) -> (SqlStatementType, &'static str) {
    match stmt {
        Statement::Query { .. } => (SqlStatementType::Select, "SELECT"),
        Statement::ShowTables { .. } => (SqlStatementType::Select, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (SqlStatementType::Select, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (SqlStatementType::Select, "SHOW DATABASES"),
        Statement::ShowSchemas { .. } => (SqlStatementType::Select, "SHOW SCHEMAS"),
        Statement::ShowCreate { .. } => (SqlStatementType::Select, "SHOW CREATE"),
        Statement::ShowFunctions { .. } => (SqlStatementType::Select, "SHOW FUNCTIONS"),
        Statement::ShowVariable { .. } => (SqlStatementType::Select, "SHOW VARIABLE"),
        Statement::ShowVariables { .. } => (SqlStatementType::Select, "SHOW VARIABLES"),
        Statement::ShowStatus { .. } => (SqlStatementType::Select, "SHOW STATUS"),
        Statement::ShowCollation { .. } => (SqlStatementType::Select, "SHOW COLLATION"),
        Statement::ExplainTable { .. } => (SqlStatementType::Select, "DESCRIBE"),

        // EXPLAIN ANALYZE executes its statement, so classify what it wraps
        Statement::Explain { statement, .. } => match classify_statement(statement) {
            (SqlStatementType::Select, _) => (SqlStatementType::Select, "EXPLAIN"),
            other => other,
        },

        Statement::Insert { .. } => (SqlStatementType::DmlWrite, "INSERT"),
        Statement::Update { .. } => (SqlStatementType::DmlWrite, "UPDATE"),
        Statement::Delete { .. } => (SqlStatementType::DmlWrite, "DELETE"),
        Statement::Merge { .. } => (SqlStatementType::DmlWrite, "MERGE"),

        Statement::CreateTable { .. } => (SqlStatementType::Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (SqlStatementType::Ddl, "CREATE VIEW"),
        Statement::CreateIndex { .. } => (SqlStatementType::Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (SqlStatementType::Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (SqlStatementType::Ddl, "CREATE DATABASE"),
        Statement::CreateFunction { .. } => (SqlStatementType::Ddl, "CREATE FUNCTION"),
        Statement::CreateProcedure { .. } => (SqlStatementType::Ddl, "CREATE PROCEDURE"),
        Statement::CreateTrigger { .. } => (SqlStatementType::Ddl, "CREATE TRIGGER"),
        Statement::CreateRole { .. } => (SqlStatementType::Ddl, "CREATE ROLE"),
        Statement::AlterTable { .. } => (SqlStatementType::Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (SqlStatementType::Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (SqlStatementType::Ddl, "ALTER INDEX"),
        Statement::Drop { .. } => (SqlStatementType::Ddl, "DROP"),
        Statement::DropFunction { .. } => (SqlStatementType::Ddl, "DROP FUNCTION"),
        Statement::DropProcedure { .. } => (SqlStatementType::Ddl, "DROP PROCEDURE"),
        Statement::DropTrigger { .. } => (SqlStatementType::Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (SqlStatementType::Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (SqlStatementType::Ddl, "COMMENT"),

        Statement::StartTransaction { .. } => (SqlStatementType::Transaction, "START TRANSACTION"),
        Statement::Commit { .. } => (SqlStatementType::Transaction, "COMMIT"),
        Statement::Rollback { .. } => (SqlStatementType::Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (SqlStatementType::Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (SqlStatementType::Transaction, "RELEASE SAVEPOINT"),

        Statement::Call { .. } => (SqlStatementType::ProcedureCall, "CALL"),
        Statement::Execute { .. } => (SqlStatementType::ProcedureCall, "EXECUTE"),
        Statement::Prepare { .. } => (SqlStatementType::ProcedureCall, "PREPARE"),
        Statement::Deallocate { .. } => (SqlStatementType::ProcedureCall, "DEALLOCATE"),

        Statement::Grant { .. } => (SqlStatementType::Administrative, "GRANT"),
        Statement::Revoke { .. } => (SqlStatementType::Administrative, "REVOKE"),
        Statement::Set { .. } => (SqlStatementType::Administrative, "SET"),
        Statement::Use { .. } => (SqlStatementType::Administrative, "USE"),
        Statement::Kill { .. } => (SqlStatementType::Administrative, "KILL"),
        Statement::Analyze { .. } => (SqlStatementType::Administrative, "ANALYZE"),
        Statement::LockTables { .. } => (SqlStatementType::Administrative, "LOCK TABLES"),
        Statement::UnlockTables { .. } => (SqlStatementType::Administrative, "UNLOCK TABLES"),
        Statement::Flush { .. } => (SqlStatementType::Administrative, "FLUSH"),
        Statement::OptimizeTable { .. } => (SqlStatementType::Administrative, "OPTIMIZE"),

        _ => (SqlStatementType::Unknown, "Unknown"),
    }
}
