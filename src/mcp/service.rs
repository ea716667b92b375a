//! MCP service implementation using rmcp.
//!
//! This module defines the MySqlService struct exposing the three MySQL tools
//! over the MCP protocol using the rmcp framework's macros.

use crate::db::MySqlSessionProvider;
use crate::tools::query::{QueryToolHandler, RunQueryInput, RunQueryOutput};
use crate::tools::schema::{
    DescribeIndexesInput, DescribeIndexesOutput, DescribeTableInput, DescribeTableOutput,
    SchemaToolHandler,
};
use crate::tools::sql_validator::StatementPolicy;
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct MySqlService {
    /// Opens a fresh session for every tool call
    provider: Arc<MySqlSessionProvider>,
    policy: StatementPolicy,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl MySqlService {
    /// Create a new MySqlService instance.
    pub fn new(provider: Arc<MySqlSessionProvider>, policy: StatementPolicy) -> Self {
        Self {
            provider,
            policy,
            tool_router: Self::tool_router(),
        }
    }
}

/// Log a failed tool call and convert it for the MCP client.
fn tool_error(tool: &str, err: crate::error::DbError) -> McpError {
    warn!(tool, error = %err, "Tool call failed");
    McpError::from(err)
}

#[tool_router]
impl MySqlService {
    #[tool(
        description = "Run SQL against the configured MySQL database and return the result.\nThe SQL is sent as-is; multiple statements separated by `;` are allowed.\nStatements with a result set return columns and rows; others return rows_affected and last_insert_id.\nOutput format: json (default), table, or markdown."
    )]
    async fn run_query(
        &self,
        Parameters(input): Parameters<RunQueryInput>,
    ) -> Result<Json<RunQueryOutput>, McpError> {
        QueryToolHandler::with_policy(self.provider.clone(), self.policy)
            .run_query(input)
            .await
            .map(Json)
            .map_err(|e| tool_error("run_query", e))
    }

    #[tool(
        description = "Describe the columns of a table in declared order.\nReturns name, data type, full column type, nullability, key flags, default, extra, length and comment.\nA table that does not exist returns an empty column list."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        SchemaToolHandler::new(self.provider.clone())
            .describe_table(input)
            .await
            .map(Json)
            .map_err(|e| tool_error("describe_table", e))
    }

    #[tool(
        description = "List the indexes of a table and its foreign keys in both directions.\nOutbound foreign keys are declared on this table; inbound foreign keys are declared on other tables and reference this one.\nA table that does not exist returns empty lists."
    )]
    async fn describe_indexes_and_foreign_keys(
        &self,
        Parameters(input): Parameters<DescribeIndexesInput>,
    ) -> Result<Json<DescribeIndexesOutput>, McpError> {
        SchemaToolHandler::new(self.provider.clone())
            .describe_indexes_and_foreign_keys(input)
            .await
            .map(Json)
            .map_err(|e| tool_error("describe_indexes_and_foreign_keys", e))
    }
}

#[tool_handler]
impl ServerHandler for MySqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Tools for one MySQL database ({target}).\n\
                \n\
                - `run_query`: execute SQL and get rows or affected-row counts\n\
                - `describe_table`: columns of `schema`.`table`\n\
                - `describe_indexes_and_foreign_keys`: indexes plus outbound and inbound foreign keys\n\
                \n\
                Statement policy: {policy}. Every call uses its own connection, so \
                session state such as variables or open transactions does not carry \
                over between calls.",
                target = self.provider.target(),
                policy = self.policy,
            )),
        }
    }
}
