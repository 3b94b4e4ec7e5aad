//! `expense-sheet` records personal expenses into a Google sheet and keeps yearly and monthly
//! rollup tables next to the expense rows up-to-date.
//!
//! The interesting part lives in [`Synchronizer`], which appends a row, re-sorts the table by
//! date and recomputes both aggregate tables. Everything else is a thin adapter: the CLI in
//! [`args`] and [`commands`], and the MCP server that lets a chat agent record expenses.

mod api;
pub mod args;
mod categories;
pub mod commands;
mod config;
mod error;
mod layout;
mod mcp;
pub mod model;
mod schema;
mod sync;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use categories::CategoryRegistry;
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use layout::Layout;
pub use schema::HeaderStatus;
pub use sync::{SyncReport, SyncStep, Synchronizer};
