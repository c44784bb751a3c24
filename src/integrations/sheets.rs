use super::{TabularStore, WriteOutcome};
use crate::error::IntegrationError;
use crate::models::WriteMode;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Tabular store speaking the Google Sheets v4 values API. Any backend
/// exposing the same `values/{range}` read, append and update endpoints
/// works unchanged.
pub struct HttpTabularStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTabularStore {
    pub fn new(base_url: String, token: String) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IntegrationError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn values_url(&self, locator: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url, locator, range
        )
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<Value, IntegrationError> {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IntegrationError::Auth(format!(
                "sheet access denied ({status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Provider(format!(
                "sheet request failed ({status}): {body}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| IntegrationError::Provider(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl TabularStore for HttpTabularStore {
    async fn authenticate(&self) -> Result<bool, IntegrationError> {
        Ok(!self.token.is_empty())
    }

    async fn read(&self, locator: &str, range: &str) -> Result<Vec<Vec<Value>>, IntegrationError> {
        debug!(locator = %locator, range = %range, "Reading sheet range");

        let response = self
            .client
            .get(self.values_url(locator, range))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body = Self::check_status(response).await?;

        let values = body
            .get("values")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| row.as_array().cloned().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        Ok(values)
    }

    async fn write(
        &self,
        locator: &str,
        range: &str,
        mode: WriteMode,
        rows: &[Vec<Value>],
    ) -> Result<WriteOutcome, IntegrationError> {
        debug!(locator = %locator, range = %range, rows = rows.len(), ?mode, "Writing sheet range");

        let payload = json!({ "values": rows });
        let request = match mode {
            WriteMode::Append => self
                .client
                .post(format!("{}:append", self.values_url(locator, range)))
                .query(&[("valueInputOption", "USER_ENTERED")]),
            WriteMode::Overwrite => self
                .client
                .put(self.values_url(locator, range))
                .query(&[("valueInputOption", "USER_ENTERED")]),
        };

        let response = request
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        let body = Self::check_status(response).await?;

        // Append responses nest the stats under "updates".
        let updates = body.get("updates").unwrap_or(&body);
        let rows_written = updates
            .get("updatedRows")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(rows.len());
        let updated_range = updates
            .get("updatedRange")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(WriteOutcome {
            rows_written,
            updated_range,
        })
    }
}
