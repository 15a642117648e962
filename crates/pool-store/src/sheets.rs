//! Google Sheets store
//!
//! Reads and writes through the Sheets v4 values API:
//! - `GET  {api_base}/v4/spreadsheets/{id}/values/{sheet}!{range}`
//! - `PUT  {api_base}/v4/spreadsheets/{id}/values/{sheet}!{col}{row}?valueInputOption=RAW`
//!
//! Authentication is a pre-issued OAuth access token sent as a bearer token.
//! Every request carries its own timeout so a slow spreadsheet cannot hold
//! the pool lock indefinitely.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::a1::column_index;
use crate::error::{Result, StoreError};
use crate::{StoreAdapter, Table};

/// Public Sheets API endpoint.
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Body of a values GET. `values` is omitted entirely when the range is empty.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Store backed by one sheet of a Google spreadsheet.
pub struct SheetsStore {
    client: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
    access_token: Secret<String>,
    timeout: Duration,
}

impl SheetsStore {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        access_token: Secret<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            access_token,
            timeout,
        }
    }

    /// Build the values URL for an A1 range on this sheet.
    fn values_url(&self, range: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .map_err(|e| StoreError::InvalidAddress(format!("api_base {}: {e}", self.api_base)))?;
        let qualified = format!("{}!{range}", self.sheet_name);
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidAddress("api_base cannot carry a path".into()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                qualified.as_str(),
            ]);
        Ok(url)
    }

    async fn fetch(&self, range: &str) -> Result<Table> {
        let url = self.values_url(range)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("sheet fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), "sheet fetch rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let range_body = response
            .json::<ValueRange>()
            .await
            .map_err(|e| StoreError::Parse(format!("invalid values response: {e}")))?;

        let table: Table = range_body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        debug!(rows = table.len(), range, "fetched sheet");
        Ok(table)
    }

    async fn write(&self, row: usize, column: &str, value: &str) -> Result<()> {
        if row == 0 || column_index(column).is_none() {
            return Err(StoreError::InvalidAddress(format!("{column}{row}")));
        }
        let mut url = self.values_url(&format!("{column}{row}"))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let response = self
            .client
            .put(url)
            .bearer_auth(self.access_token.expose())
            .timeout(self.timeout)
            .json(&serde_json::json!({ "values": [[value]] }))
            .send()
            .await
            .map_err(|e| StoreError::Http(format!("sheet write failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            warn!(status = status.as_u16(), row, column, "sheet write rejected");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(row, column, "wrote sheet cell");
        Ok(())
    }
}

/// Formatted cell values arrive as strings; anything else is stringified.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl StoreAdapter for SheetsStore {
    fn id(&self) -> &str {
        "sheets"
    }

    fn fetch_table<'a>(
        &'a self,
        range: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Table>> + Send + 'a>> {
        Box::pin(self.fetch(range))
    }

    fn write_cell<'a>(
        &'a self,
        row: usize,
        column: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.write(row, column, value))
    }
}
