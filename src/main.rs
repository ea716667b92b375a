//! MySQL MCP Server - Main entry point.
//!
//! Reads the `MYSQL_*` settings once, then serves the MySQL tools over stdio
//! to the client that launched the process.

use mysql_mcp_server::config::Config;
use mysql_mcp_server::db::MySqlSessionProvider;
use mysql_mcp_server::mcp::MySqlService;
use mysql_mcp_server::transport::StdioTransport;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the MCP channel.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    let params = match config.connection_params() {
        Ok(params) => params,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!();
            eprintln!("Set MYSQL_HOST, MYSQL_USER, MYSQL_PASSWORD and MYSQL_DB (MYSQL_PORT defaults to 3306).");
            std::process::exit(1);
        }
    };

    let provider = Arc::new(MySqlSessionProvider::new(&params));
    info!(
        target_db = %provider.target(),
        statement_policy = %config.statement_policy,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let service = MySqlService::new(provider, config.statement_policy);
    let transport = StdioTransport::new(service);
    info!(transport = transport.name(), "Serving MCP");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
