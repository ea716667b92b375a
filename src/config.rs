//! Configuration handling for the MySQL MCP Server.
//!
//! Connection settings come from the `MYSQL_*` environment variables (or the
//! matching CLI flags) and are read once at startup. The parsed [`Config`] is
//! turned into an immutable [`ConnectionParams`] value that is handed to the
//! session provider; nothing reads the environment after that.

use crate::tools::sql_validator::StatementPolicy;
use clap::Parser;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "MCP server exposing MySQL query and schema introspection tools to AI assistants",
    version,
    author
)]
pub struct Config {
    /// MySQL server host
    #[arg(long = "host", env = "MYSQL_HOST")]
    pub host: String,

    /// MySQL server port
    #[arg(long = "port", default_value_t = DEFAULT_MYSQL_PORT, env = "MYSQL_PORT")]
    pub port: u16,

    /// MySQL user name
    #[arg(long = "user", env = "MYSQL_USER")]
    pub user: String,

    /// MySQL password
    #[arg(long = "password", env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Database (schema) to connect to
    #[arg(long = "database", env = "MYSQL_DB")]
    pub database: String,

    /// Connection character set
    #[arg(long, default_value = DEFAULT_CHARSET, env = "MYSQL_CHARSET")]
    pub charset: String,

    /// Which statements run_query accepts (unrestricted or read-only)
    #[arg(
        long,
        value_enum,
        default_value = "unrestricted",
        env = "MYSQL_STATEMENT_POLICY"
    )]
    pub statement_policy: StatementPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the immutable connection parameters used by every session.
    pub fn connection_params(&self) -> Result<ConnectionParams, String> {
        ConnectionParams::new(
            &self.host,
            self.port,
            &self.user,
            &self.password,
            &self.database,
        )
        .map(|params| params.with_charset(&self.charset))
    }
}

/// Connection parameters for one MySQL server and database.
///
/// Constructed once at startup; cloned into the session provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub charset: String,
}

impl ConnectionParams {
    /// Create connection parameters, rejecting blank required values.
    pub fn new(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, String> {
        let host = host.trim();
        if host.is_empty() {
            return Err("MYSQL_HOST must not be empty".to_string());
        }
        if port == 0 {
            return Err("MYSQL_PORT must be greater than 0".to_string());
        }
        let user = user.trim();
        if user.is_empty() {
            return Err("MYSQL_USER must not be empty".to_string());
        }
        let database = database.trim();
        if database.is_empty() {
            return Err("MYSQL_DB must not be empty".to_string());
        }

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
        })
    }

    /// Override the connection character set.
    pub fn with_charset(mut self, charset: &str) -> Self {
        let charset = charset.trim();
        if !charset.is_empty() {
            self.charset = charset.to_string();
        }
        self
    }

    /// Human-readable target for logs (no credentials).
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .finish()
    }
}
