//! These structs provide the CLI interface for the expense-sheet CLI.

use crate::model::Amount;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expense-sheet: record personal expenses into a Google Sheet.
///
/// Each expense becomes a row of Date, Category, Amount and Description. After every expense the
/// rows are sorted by date and two summary tables next to them are recomputed: total expenses per
/// year, and total expenses per month for the current year.
///
/// You will need to set up a Google Sheets API OAuth client for this and run `init` followed by
/// `auth` once.
///
/// There is also a mode in which an AI agent or chat client can record expenses through the mcp
/// subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need to get a few things ready beforehand.
    ///
    /// - Decide what directory you want to store configuration in and pass this as --home. By
    ///   default, it will be $HOME/expense-sheet.
    ///
    /// - Get the URL of your Google Sheet and pass it as --sheet-url.
    ///
    /// - Create a Desktop OAuth client in Google Cloud Console, with the Sheets API enabled and
    ///   http://localhost as a redirect URI, and download its credentials. You will pass this file
    ///   as --client-secret.
    Init(InitArgs),
    /// Authenticate with Google Sheets via OAuth.
    Auth(AuthArgs),
    /// Record an expense.
    Add(AddArgs),
    /// List known categories, optionally only those containing QUERY.
    Categories(CategoriesArgs),
    /// Re-sort the expense rows and recompute both totals tables without adding anything.
    Resync,
    /// Run as an MCP server over stdio so that an agent can record expenses.
    Mcp,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and credentials are held. Defaults to ~/expense-sheet
    #[arg(long, env = "EXPENSE_SHEET_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `expense-sheet init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be copied to the
    /// default secrets location in the main data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `expense-sheet auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh authentication.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// (Not shown): Args for the `expense-sheet add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The expense category, e.g. "Food & Dining". New categories are remembered.
    #[arg(long)]
    category: String,

    /// How much was spent, a positive number such as 12.50.
    #[arg(long)]
    amount: Amount,

    /// What the expense was for.
    #[arg(long)]
    description: String,

    /// The date of the expense as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl AddArgs {
    pub fn new(
        category: impl Into<String>,
        amount: Amount,
        description: impl Into<String>,
        date: Option<NaiveDate>,
    ) -> Self {
        Self {
            category: category.into(),
            amount,
            description: description.into(),
            date,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

/// (Not shown): Args for the `expense-sheet categories` command.
#[derive(Debug, Parser, Clone)]
pub struct CategoriesArgs {
    /// Only show categories that contain this text, ignoring case.
    query: Option<String>,
}

impl CategoriesArgs {
    pub fn new(query: Option<String>) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expense-sheet"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSE_SHEET_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("expense-sheet")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from([
            "expense-sheet",
            "--home",
            "/tmp/expenses",
            "add",
            "--category",
            "Food & Dining",
            "--amount",
            "$12.50",
            "--description",
            "lunch",
            "--date",
            "2024-03-01",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/expenses"));
        let Command::Add(add) = args.command() else {
            panic!("expected the add command, got {:?}", args.command());
        };
        assert_eq!(add.category(), "Food & Dining");
        assert_eq!(add.amount().to_string(), "12.5");
        assert_eq!(add.date(), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_parse_add_rejects_bad_amount() {
        let result = Args::try_parse_from([
            "expense-sheet",
            "add",
            "--category",
            "Travel",
            "--amount",
            "lots",
            "--description",
            "train",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_categories() {
        let args =
            Args::try_parse_from(["expense-sheet", "--log-level", "debug", "categories", "foo"])
                .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::Categories(categories) = args.command() else {
            panic!("expected the categories command");
        };
        assert_eq!(categories.query(), "foo");
    }
}
