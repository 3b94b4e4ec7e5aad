//! Command handlers for the expense-sheet CLI.
//!
//! This module contains implementations for all CLI subcommands. The expense handlers are also
//! what the MCP tools call, so both interfaces report the same outcome in the same words.

mod auth;
mod expense;
mod init;
mod mcp;

use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

pub use auth::{auth, auth_verify};
pub use expense::{add_expense, categories, resync, FAILURE_MESSAGE};
pub use init::init;
pub use mcp::mcp;

/// What a command produced: a message for the person (or agent) who ran it and, for the expense
/// commands, structured data such as the `SyncReport` or the list of suggested categories.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    message: String,
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Prints the message to stdout, where `categories` output can be piped, and logs the
    /// structured data as JSON at debug level. Logs go to stderr.
    pub fn print(&self) {
        println!("{}", self.message);
        if let Some(structure) = self.structure() {
            match serde_json::to_string_pretty(structure) {
                Ok(json) => debug!("Command output:\n{json}"),
                Err(e) => debug!("Unable to serialize the command output: {e}"),
            }
        }
    }
}
