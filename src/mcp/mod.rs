//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes expense recording as tools for agents and chat
//! clients. The server communicates via JSON-RPC over stdio.

mod mcp_utils;
mod tools;

use crate::{Config, Mode, Synchronizer};
use anyhow::Context;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tracing::info;

/// The expense-sheet MCP server.
///
/// Every tool call shares one `Synchronizer`, so the header check and category load happen once
/// per session and concurrent `record_expense` calls are serialized.
#[derive(Clone)]
pub struct ExpenseServer {
    sync: Arc<Synchronizer>,
    tool_router: ToolRouter<ExpenseServer>,
}

impl ExpenseServer {
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self {
            sync,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for ExpenseServer {
    /// Returns server information sent to the MCP client during initialization.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "expense-sheet".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function connects to the
/// sheet, starts the MCP server and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object
/// - `mode`: Whether we are running with a live Google sheet or with a test sheet
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
pub(crate) async fn run_server(config: Config, mode: Mode, io: Io) -> crate::Result<()> {
    let sync = Synchronizer::connect(&config, mode).await?;
    let server = ExpenseServer::new(Arc::new(sync));
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server.serve(stdio()).await,
        #[cfg(test)]
        Io::Mock(stream) => server.serve(stream).await,
    }
    .context("Failed to start MCP server")?;

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service.waiting().await.context("MCP server error")?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheetState;
    use crate::test::TestEnv;
    use rmcp::model::{CallToolRequestParam, CallToolResult};
    use rmcp::service::{RoleClient, RunningService};
    use tokio::io::duplex;

    fn arguments(value: serde_json::Value) -> Option<serde_json::Map<String, serde_json::Value>> {
        value.as_object().cloned()
    }

    async fn call(
        client: &RunningService<RoleClient, ()>,
        name: &'static str,
        args: serde_json::Value,
    ) -> CallToolResult {
        client
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments: arguments(args),
            })
            .await
            .unwrap_or_else(|e| panic!("{name} call failed: {e}"))
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Integration test for the MCP server using an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        // Create duplex channel - one end for server, one for client
        let (client_io, server_io) = duplex(4096);

        // Create test environment (holds TempDir alive for duration of test)
        let env = TestEnv::new().await;
        env.set_state(TestSheetState::from_rows([
            vec!["Date", "Category", "Amount", "Description"],
            vec!["2020-01-05", "Coffee", "4", "latte"],
        ]));
        let config = env.config();

        let server_handle =
            tokio::spawn(
                async move { run_server(config, Mode::Testing, Io::Mock(server_io)).await },
            );

        let client = ().serve(client_io).await.expect("Failed to create client");

        let tools = client
            .list_tools(Default::default())
            .await
            .expect("Failed to list tools");
        let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["record_expense", "resync", "suggest_categories"]);

        // Categories from the sheet are loaded at startup.
        let result = call(&client, "suggest_categories", serde_json::json!({"query": "COF"})).await;
        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(text(&result).lines().next(), Some("Coffee"));

        let result = call(
            &client,
            "record_expense",
            serde_json::json!({
                "category": "Food & Dining",
                "amount": 12.5,
                "description": "lunch",
                "date": "2019-03-01"
            }),
        )
        .await;
        assert!(
            !result.is_error.unwrap_or(false),
            "record_expense returned error: {:?}",
            result.content
        );
        assert!(text(&result).starts_with(
            "Expense added to Google Sheet!\nDate: 2019-03-01\nCategory: Food & Dining\n\
            Amount: 12.5\nDescription: lunch"
        ));

        let state = env.get_state();
        assert_eq!(
            state.values("Sheet1!A2:D"),
            vec![
                vec!["2019-03-01", "Food & Dining", "12.5", "lunch"],
                vec!["2020-01-05", "Coffee", "4", "latte"],
            ]
        );
        assert_eq!(
            state.values("Sheet1!F1:G"),
            vec![
                vec!["Year", "Total Expenses"],
                vec!["2019", "12.5"],
                vec!["2020", "4"]
            ]
        );

        let result = call(
            &client,
            "record_expense",
            serde_json::json!({"category": "Travel", "amount": -3, "description": "refund"}),
        )
        .await;
        assert!(result.is_error.unwrap_or(false));

        let result = call(&client, "resync", serde_json::json!({})).await;
        assert!(
            !result.is_error.unwrap_or(false),
            "resync returned error: {:?}",
            result.content
        );

        // Drop client to trigger server shutdown
        drop(client);

        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");

        assert!(
            server_result.is_ok(),
            "Server returned error: {:?}",
            server_result
        );
    }
}
