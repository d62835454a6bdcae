//! Google Sheets v4 values API implementing `SheetStore`

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::SheetsConfig;
use crate::core::writeback::cell_reference;
use crate::error::{UploaderError, UploaderResult};
use crate::traits::SheetStore;
use crate::types::{CellUpdate, SheetTab};

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig, timeout: Duration) -> UploaderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn url(&self, segments: &[&str]) -> UploaderResult<url::Url> {
        let mut url = url::Url::parse(&self.base_url).map_err(|e| sheet_error(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| sheet_error("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response, action: &str) -> UploaderResult<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no error message");
            return Err(sheet_error(format!("{action} failed with HTTP {}: {}", status.as_u16(), message)));
        }
        Ok(body)
    }
}

fn sheet_error(message: impl Into<String>) -> UploaderError {
    UploaderError::Sheet {
        message: message.into(),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn read_tab(&self, tab: &str) -> UploaderResult<SheetTab> {
        let range = format!("'{}'", tab.replace('\'', "''"));
        let url = self.url(&["values", &range])?;
        debug!("Reading sheet tab '{}'", tab);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body = Self::check(response, "read").await?;

        let mut rows: Vec<Vec<String>> = body
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        if rows.is_empty() {
            return Ok(SheetTab::default());
        }
        let header = rows.remove(0);
        Ok(SheetTab { header, rows })
    }

    async fn write_cells(&self, tab: &str, updates: Vec<CellUpdate>) -> UploaderResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let data: Vec<Value> = updates
            .iter()
            .map(|cell| json!({ "range": cell_reference(tab, cell), "values": [[cell.value]] }))
            .collect();
        let url = self.url(&["values:batchUpdate"])?;
        debug!("Writing {} cell(s) to '{}'", updates.len(), tab);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await?;
        Self::check(response, "batch update").await?;
        Ok(())
    }
}
