//! # Google Sheets Control Log Source
//!
//! Race control for many series keeps its log in a shared spreadsheet, one tab
//! per session. The event's source parameter is the tab name; the whole tab is
//! read through the Sheets v4 `values` endpoint and parsed by a `ColumnMapper`
//! kept per tab, so each tab's header is only mapped once.
//!
//! Time-only cells are dated with the event-local day the poller passes in,
//! so an evening session west of UTC is not shifted to the next day.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ControlLogError, Result};
use crate::model::ControlLogEntry;
use crate::retrieve::ApiClient;
use crate::sources::column_mapping::ColumnMapper;
use crate::sources::ControlLogSource;

/// Type tag events use to select this source.
pub const GOOGLE_SHEETS_SOURCE_TYPE: &str = "google-sheets";

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/";

/// Body of a `spreadsheets.values.get` reply.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Control logs read from a Google spreadsheet.
pub struct GoogleSheetsSource {
    client: ApiClient,
    spreadsheet_id: String,
    api_key: String,
    mappers: Mutex<HashMap<String, ColumnMapper>>,
}

impl GoogleSheetsSource {
    /// Creates a source for one spreadsheet.
    pub fn new(spreadsheet_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = ApiClient::new(SHEETS_BASE_URL, None, 3)
            .map_err(|e| ControlLogError::Config(e.to_string()))?;
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            api_key: api_key.into(),
            mappers: Mutex::new(HashMap::new()),
        })
    }

    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let url = self
            .client
            .endpoint(
                &["spreadsheets", self.spreadsheet_id.as_str(), "values", sheet],
                &[("key", self.api_key.as_str()), ("valueRenderOption", "FORMATTED_VALUE")],
            )
            .map_err(|e| ControlLogError::Fetch(e.to_string()))?;

        let response = self
            .client
            .get_json::<ValueRange>(url)
            .await
            .map_err(|e| ControlLogError::Fetch(e.to_string()))?;

        if !response.success {
            return Err(ControlLogError::Fetch(format!(
                "Sheets API returned {} for '{}': {}",
                response.status,
                sheet,
                response.error_body.unwrap_or_default()
            )));
        }

        let range = response.data.unwrap_or(ValueRange { values: Vec::new() });
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ControlLogSource for GoogleSheetsSource {
    fn source_type(&self) -> &str {
        GOOGLE_SHEETS_SOURCE_TYPE
    }

    async fn load_control_log(&self, parameter: &str) -> Result<Vec<ControlLogEntry>> {
        self.load_control_log_for_day(parameter, Utc::now().date_naive())
            .await
    }

    async fn load_control_log_for_day(
        &self,
        parameter: &str,
        local_day: NaiveDate,
    ) -> Result<Vec<ControlLogEntry>> {
        let rows = self.fetch_rows(parameter).await?;

        let mut mappers = self
            .mappers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let log = mappers
            .entry(parameter.to_string())
            .or_default()
            .parse(&rows, local_day);

        debug!(sheet = parameter, rows = rows.len(), entries = log.len(), "Parsed control log sheet");
        Ok(log)
    }
}
