//! Keeps the header row of the expense table in the expected shape.

use crate::api::Sheet;
use crate::model::HEADERS;
use crate::{Layout, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What `ensure_headers` found.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStatus {
    /// The header row already matched and nothing was written.
    Present,
    /// The header row was missing or wrong and has been (re)written in bold.
    Written,
}

serde_plain::derive_display_from_serialize!(HeaderStatus);

/// Reads the header row and, unless it is exactly `Date, Category, Amount, Description`, overwrites
/// it with those labels and makes it bold.
pub(crate) async fn ensure_headers(sheet: &mut dyn Sheet, layout: &Layout) -> Result<HeaderStatus> {
    let range = layout.header_range();
    let rows = sheet.read_range(&range).await?;
    if headers_match(rows.first()) {
        debug!("Headers are present in {range}");
        return Ok(HeaderStatus::Present);
    }

    let header: Vec<String> = HEADERS.iter().map(|s| s.to_string()).collect();
    sheet.write_range(&range, &[header]).await?;
    sheet.set_bold(layout.header_grid(), true).await?;
    info!("Wrote the header row to {range}");
    Ok(HeaderStatus::Written)
}

fn headers_match(row: Option<&Vec<String>>) -> bool {
    match row {
        Some(row) => row.len() == HEADERS.len() && row.iter().zip(HEADERS).all(|(a, b)| a == b),
        None => false,
    }
}
