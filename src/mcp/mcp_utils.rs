//! Conversion of command output into MCP tool results.

use crate::commands::Out;
use rmcp::model::{CallToolResult, Content};
use rmcp::ErrorData;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{error, warn};

/// The confirmation text first, then the structured data (e.g. the `SyncReport`) as JSON so the
/// agent can tell which steps ran.
fn to_content<T>(out: Out<T>) -> Vec<Content>
where
    T: Debug + Clone + Serialize,
{
    let mut content = vec![Content::text(out.message())];
    if let Some(structure) = out.structure() {
        match Content::json(structure) {
            Ok(json) => content.push(json),
            Err(e) => error!("Unable to serialize the tool output as JSON: {e}"),
        }
    }
    content
}

/// Turns a command result into a tool result. A failed command is a tool error, not a protocol
/// error, so the agent sees the message and the session carries on. The message includes the
/// error's context chain, e.g. "The date '03/01/2024' is not in YYYY-MM-DD format: ...".
pub(super) fn tool_result<T>(result: crate::Result<Out<T>>) -> Result<CallToolResult, ErrorData>
where
    T: Debug + Clone + Serialize,
{
    Ok(match result {
        Ok(out) => CallToolResult::success(to_content(out)),
        Err(e) => {
            warn!("Tool call failed: {e:#}");
            CallToolResult::error(vec![Content::text(format!("{e:#}"))])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncReport;
    use anyhow::{anyhow, Context};

    fn texts(result: &CallToolResult) -> Vec<String> {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[test]
    fn test_success_carries_report() {
        let report = SyncReport {
            appended: true,
            sorted: true,
            ..SyncReport::default()
        };
        let result = tool_result(Ok(Out::new("Expense added", report))).unwrap();
        assert!(!result.is_error.unwrap_or(false));

        let texts = texts(&result);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "Expense added");
        let json: serde_json::Value = serde_json::from_str(&texts[1]).unwrap();
        assert_eq!(json["appended"], true);
        assert_eq!(json["yearly_recomputed"], false);
    }

    #[test]
    fn test_message_only() {
        let result = tool_result(Ok(Out::<()>::new_message("Done"))).unwrap();
        assert_eq!(texts(&result), vec!["Done"]);
    }

    #[test]
    fn test_error_includes_context() {
        let err: crate::Result<Out<()>> = Err(anyhow!("bad month"));
        let result = tool_result(err.context("Unable to read the date")).unwrap();
        assert!(result.is_error.unwrap_or(false));
        assert_eq!(texts(&result), vec!["Unable to read the date: bad month"]);
    }
}
