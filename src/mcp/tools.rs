//! The MCP tools: record an expense, suggest categories and resync the derived tables.

use crate::args::AddArgs;
use crate::commands::{self, Out};
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::ExpenseServer;
use crate::model::{Amount, DATE_FORMAT};
use crate::SyncReport;
use anyhow::Context;
use chrono::NaiveDate;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Parameters for the record_expense tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "RecordExpenseParams")]
pub struct RecordExpenseParams {
    /// The expense category, e.g. "Food & Dining". Use suggest_categories to find existing ones.
    pub category: String,

    /// How much was spent. Must be greater than zero.
    pub amount: f64,

    /// What the expense was for.
    pub description: String,

    /// The date of the expense as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
}

impl RecordExpenseParams {
    fn into_args(self) -> crate::Result<AddArgs> {
        let amount = Amount::from_f64(self.amount)?;
        let date = match self.date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => Some(
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .with_context(|| format!("The date '{date}' is not in YYYY-MM-DD format"))?,
            ),
            _ => None,
        };
        Ok(AddArgs::new(
            self.category,
            amount,
            self.description,
            date,
        ))
    }
}

/// Parameters for the suggest_categories tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[schemars(title = "SuggestCategoriesParams")]
pub struct SuggestCategoriesParams {
    /// Text the category should contain, ignoring case. Omit it to list the first 25 categories.
    #[serde(default)]
    pub query: Option<String>,
}

#[tool_router(vis = "pub(super)")]
impl ExpenseServer {
    /// Record one expense in the Google Sheet. The row is appended, the rows are re-sorted by
    /// date, and the yearly and monthly totals are recomputed.
    ///
    /// The text result repeats what was recorded. The structured result reports each step:
    /// `appended`, `formatted`, `sorted`, `yearly_recomputed` and `monthly_recomputed`. When
    /// `appended` is true the expense is recorded even if a later step failed; call `resync`
    /// rather than recording it again.
    #[tool]
    async fn record_expense(
        &self,
        Parameters(params): Parameters<RecordExpenseParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: record_expense called");
        tool_result(self.record(params).await)
    }

    /// Suggest up to 25 known categories containing `query`, ignoring case. The list holds the
    /// predefined categories, the categories already in the sheet, and any added since.
    #[tool]
    async fn suggest_categories(
        &self,
        Parameters(params): Parameters<SuggestCategoriesParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: suggest_categories called");
        let query = params.query.unwrap_or_default();
        tool_result(commands::categories(&self.sync, &query).await)
    }

    /// Re-sort the expense rows by date and recompute the yearly and monthly totals without
    /// recording anything.
    #[tool]
    async fn resync(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: resync called");
        tool_result(commands::resync(&self.sync).await)
    }
}

impl ExpenseServer {
    async fn record(&self, params: RecordExpenseParams) -> crate::Result<Out<SyncReport>> {
        let args = params.into_args()?;
        commands::add_expense(&self.sync, &args).await
    }
}
