//! Stdio transport for the MCP server.
//!
//! JSON-RPC messages are read from stdin and written to stdout, so nothing
//! else in the process may write to stdout.

use crate::error::{DbError, DbResult};
use crate::mcp::MySqlService;
use rmcp::{ServiceExt, transport::stdio};
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// Stdio transport implementation.
pub struct StdioTransport {
    service: MySqlService,
}

impl StdioTransport {
    pub fn new(service: MySqlService) -> Self {
        Self { service }
    }

    /// Name of this transport for logging.
    pub fn name(&self) -> &'static str {
        "stdio"
    }

    /// Serve requests until the client disconnects or a shutdown signal arrives.
    ///
    /// The first SIGINT/SIGTERM cancels the service and lets in-flight calls
    /// finish; a second one during that wait exits with status 1.
    pub async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let cancellation = running_service.cancellation_token();
        let waiting = running_service.waiting();
        tokio::pin!(waiting);

        tokio::select! {
            result = &mut waiting => {
                match result {
                    Ok(reason) => {
                        info!(?reason, "Stdio transport completed");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        Err(DbError::internal(format!("Stdio transport error: {}", e)))
                    }
                }
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                cancellation.cancel();
                let drained = async {
                    if let Err(e) = waiting.as_mut().await {
                        warn!(error = %e, "Stdio transport error during shutdown");
                    }
                };
                // The stdin reader blocks runtime shutdown, so exit explicitly.
                match drain_or_force(drained, wait_for_signal()).await {
                    Shutdown::Graceful => {
                        info!("Exiting process");
                        std::process::exit(0);
                    }
                    Shutdown::Forced => {
                        warn!("Received second signal, forcing immediate exit");
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}

/// How a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutdown {
    /// The service stopped on its own.
    Graceful,
    /// Another signal arrived first.
    Forced,
}

/// Wait for the service to drain unless `second_signal` fires first.
async fn drain_or_force(
    drained: impl Future<Output = ()>,
    second_signal: impl Future<Output = ()>,
) -> Shutdown {
    tokio::select! {
        _ = drained => Shutdown::Graceful,
        _ = second_signal => Shutdown::Forced,
    }
}

/// Wait for SIGINT or SIGTERM.
///
/// A signal that cannot be installed is logged and never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
