pub mod drive;
pub mod http_ai;
pub mod sheets;
pub mod smtp;

use crate::config::EngineConfig;
use crate::error::IntegrationError;
use crate::models::WriteMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub use drive::HttpFileStore;
pub use http_ai::HttpAiProvider;
pub use sheets::HttpTabularStore;
pub use smtp::SmtpMailer;

/// Narrow capability interface over a tabular store (spreadsheet-like).
/// Protocol details of any concrete backend stay behind this boundary.
#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn authenticate(&self) -> Result<bool, IntegrationError>;

    /// Read a cell matrix from `range` of the sheet identified by `locator`.
    async fn read(&self, locator: &str, range: &str) -> Result<Vec<Vec<Value>>, IntegrationError>;

    async fn write(
        &self,
        locator: &str,
        range: &str,
        mode: WriteMode,
        rows: &[Vec<Value>],
    ) -> Result<WriteOutcome, IntegrationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub rows_written: usize,
    pub updated_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, IntegrationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        mime_type: &str,
        folder: Option<&str>,
    ) -> Result<FileDescriptor, IntegrationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<SendOutcome, IntegrationError>;
}

/// Bundle of outbound integrations handed to the component catalog at
/// construction time. Tests substitute mock implementations here.
#[derive(Clone)]
pub struct Integrations {
    pub tabular: Arc<dyn TabularStore>,
    pub ai: Arc<dyn AiProvider>,
    pub files: Arc<dyn FileStore>,
    pub mail: Arc<dyn MailTransport>,
}

impl Integrations {
    /// Build the live HTTP/SMTP adapter set from engine configuration.
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            tabular: Arc::new(HttpTabularStore::new(
                config.sheets.base_url.clone(),
                config.sheets.token.clone(),
            )?),
            ai: Arc::new(HttpAiProvider::new(
                config.ai.base_url.clone(),
                config.ai.api_key.clone(),
            )?),
            files: Arc::new(HttpFileStore::new(
                config.drive.base_url.clone(),
                config.drive.token.clone(),
            )?),
            mail: Arc::new(SmtpMailer::new(&config.smtp)?),
        })
    }
}
