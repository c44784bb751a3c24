use super::{FileDescriptor, FileStore};
use crate::error::IntegrationError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// File store speaking a Drive-style media upload API:
/// `POST {base_url}/files?uploadType=media` with the raw bytes as body.
pub struct HttpFileStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpFileStore {
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
}

#[async_trait]
impl FileStore for HttpFileStore {
    async fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        folder: Option<&str>,
    ) -> Result<FileDescriptor, IntegrationError> {
        debug!(name = %name, size = bytes.len(), mime = %mime_type, "Uploading file");

        let mut query = vec![("uploadType", "media"), ("name", name)];
        if let Some(folder) = folder {
            query.push(("folder", folder));
        }

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .query(&query)
            .bearer_auth(&self.token)
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(IntegrationError::Auth(format!(
                "file upload denied ({status})"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Provider(format!(
                "file upload failed ({status}): {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IntegrationError::Provider(format!("invalid response body: {e}")))?;

        Ok(FileDescriptor {
            id: body
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            name: body
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(name)
                .to_string(),
            url: body
                .get("webViewLink")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
