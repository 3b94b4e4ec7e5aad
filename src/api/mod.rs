//! Access to the remote spreadsheet: the `Sheet` trait and its Google and in-memory
//! implementations, plus the OAuth plumbing the Google implementation needs.

mod files;
mod oauth;
mod sheet;
mod test_sheet;

use crate::model::GridRange;
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub(crate) use oauth::TokenProvider;
pub(crate) use sheet::GoogleSheet;
pub(crate) use test_sheet::TestSheet;
#[cfg(test)]
pub(crate) use test_sheet::{Operation, TestSheetState};

/// The OAuth scopes requested during consent and required in the saved token.
pub(crate) const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this environment variable is set and non-empty, the in-memory test sheet is used instead
/// of Google.
pub(crate) const TEST_MODE_ENV: &str = "EXPENSE_SHEET_IN_TEST_MODE";

/// The primitive operations on the remote tabular store. There is no business logic here; ranges
/// are A1 notation strings such as `Sheet1!A2:D`.
#[async_trait::async_trait]
pub(crate) trait Sheet: Send {
    /// Reads the formatted values in `range`. Trailing empty cells and rows are omitted, the way
    /// the Sheets API omits them.
    async fn read_range(&mut self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Overwrites the cells starting at the top-left corner of `range` with `rows`. Values are
    /// interpreted as if a person typed them.
    async fn write_range(&mut self, range: &str, rows: &[Vec<String>]) -> Result<()>;

    /// Inserts `row` after the last row of the table found at `range` and returns the A1 range
    /// that was written, e.g. `Sheet1!A7:D7`.
    async fn append_row(&mut self, range: &str, row: &[String]) -> Result<String>;

    /// Clears the values in `range`, leaving formatting in place.
    async fn clear_range(&mut self, range: &str) -> Result<()>;

    /// Sets or unsets bold text on every cell of `range`.
    async fn set_bold(&mut self, range: GridRange, bold: bool) -> Result<()>;
}

/// Whether we talk to Google or to the in-memory test sheet.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Testing,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Testing` when `EXPENSE_SHEET_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Sheet` implementation for `mode`.
pub(crate) async fn sheet(config: &Config, mode: Mode) -> Result<Box<dyn Sheet + Send>> {
    debug!("Using {mode} mode for spreadsheet {}", config.spreadsheet_id());
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            let sheet = GoogleSheet::new(config.spreadsheet_id(), token_provider).await?;
            Ok(Box::new(sheet))
        }
        Mode::Testing => Ok(Box::new(TestSheet::new(config.spreadsheet_id()))),
    }
}
