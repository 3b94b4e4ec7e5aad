//! Implements the `Sheet` trait against the Google Sheets API.
//!
//! Value reads, writes and clears go through `sheets::Client`. Appends and formatting go straight
//! to the REST endpoints with `reqwest`, because we need the `updatedRange` of the append response
//! and a `repeatCell` batch update.

use crate::api::{Sheet, TokenProvider};
use crate::model::GridRange;
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;
use sheets::types::{
    BatchClearValuesRequest, BatchUpdateValuesRequest, DateTimeRenderOption, Dimension,
    ValueInputOption, ValueRange, ValueRenderOption,
};
use tracing::trace;
use url::Url;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet. It
/// takes a `TokenProvider`, on which it calls refresh to keep the token up-to-date.
pub(crate) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    client: sheets::Client,
    http: reqwest::Client,
}

impl GoogleSheet {
    pub(crate) async fn new(
        spreadsheet_id: impl Into<String>,
        mut token_provider: TokenProvider,
    ) -> Result<Self> {
        let client = create_sheets_client(&mut token_provider).await?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Refreshes the sheets client with a new access token if needed
    async fn refresh_client(&mut self) -> Result<()> {
        self.client = create_sheets_client(&mut self.token_provider).await?;
        Ok(())
    }

    /// `https://sheets.googleapis.com/v4/spreadsheets/{id}{suffix}` where `suffix` is appended to
    /// the id segment, e.g. `:batchUpdate`.
    fn spreadsheet_url(&self, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API).context("Invalid Sheets API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("The Sheets API URL cannot be a base"))?
            .push(&format!("{}{suffix}", self.spreadsheet_id));
        Ok(url)
    }

    async fn post_json<T>(&mut self, url: Url, body: &serde_json::Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Google Sheets API request failed with status {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Google Sheets API response")
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn read_range(&mut self, range: &str) -> Result<Vec<Vec<String>>> {
        trace!("read_range {range}");
        self.refresh_client().await?;
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to read {range}"))?;
        Ok(response.body.values)
    }

    async fn write_range(&mut self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        trace!("write_range {range} ({} rows)", rows.len());
        self.refresh_client().await?;
        let request = BatchUpdateValuesRequest {
            data: vec![ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: range.to_string(),
                values: rows.to_vec(),
            }],
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(ValueInputOption::UserEntered),
        };
        self.client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to write {range}"))?;
        Ok(())
    }

    async fn append_row(&mut self, range: &str, row: &[String]) -> Result<String> {
        trace!("append_row {range}");
        let mut url = self.spreadsheet_url("")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("The Sheets API URL cannot be a base"))?
            .push("values")
            .push(&format!("{range}:append"));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [row],
        });
        let response: AppendResponse = self
            .post_json(url, &body)
            .await
            .with_context(|| format!("Failed to append a row to {range}"))?;
        Ok(response.updates.updated_range)
    }

    async fn clear_range(&mut self, range: &str) -> Result<()> {
        trace!("clear_range {range}");
        self.refresh_client().await?;
        let request = BatchClearValuesRequest {
            ranges: vec![range.to_string()],
        };
        self.client
            .spreadsheets()
            .values_batch_clear(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to clear {range}"))?;
        Ok(())
    }

    async fn set_bold(&mut self, range: GridRange, bold: bool) -> Result<()> {
        trace!("set_bold {range:?} {bold}");
        let url = self.spreadsheet_url(":batchUpdate")?;
        let body = serde_json::json!({
            "requests": [{
                "repeatCell": {
                    "range": range,
                    "cell": {
                        "userEnteredFormat": {
                            "textFormat": { "bold": bold }
                        }
                    },
                    "fields": "userEnteredFormat.textFormat.bold"
                }
            }]
        });
        let _: serde_json::Value = self
            .post_json(url, &body)
            .await
            .context("Failed to update text formatting")?;
        Ok(())
    }
}

/// The part of the `values.append` response that we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Result<sheets::Client> {
    let access_token = token_provider.token_with_refresh().await?;

    // The sheets crate wants client_id, client_secret, redirect_uri and a refresh token, but we
    // only need the access token because we handle refresh ourselves.
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    ))
}

fn map_client_error(e: sheets::ClientError) -> anyhow::Error {
    anyhow::Error::new(e).context("Google Sheets client error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_response_parse() {
        let json = r#"{
            "spreadsheetId": "abc",
            "tableRange": "Sheet1!A1:D6",
            "updates": {
                "spreadsheetId": "abc",
                "updatedRange": "Sheet1!A7:D7",
                "updatedRows": 1,
                "updatedColumns": 4,
                "updatedCells": 4
            }
        }"#;
        let response: AppendResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.updates.updated_range, "Sheet1!A7:D7");
    }
}
