use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Engine configuration used to construct the concrete integration adapters.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.ai.validate()?;
        self.sheets.validate()?;
        self.drive.validate()?;
        self.smtp.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default)]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            api_key: String::new(),
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("ai.base_url must not be empty");
        }
        if self.model.is_empty() {
            bail!("ai.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("ai.temperature must be between 0.0 and 2.0");
        }
        if self.max_tokens == 0 {
            bail!("ai.max_tokens must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub base_url: String,
    /// OAuth bearer token. Empty means unauthenticated; sheet nodes will
    /// refuse to run.
    #[serde(default)]
    pub token: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            token: String::new(),
        }
    }
}

impl SheetsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("sheets.base_url must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token: String::new(),
        }
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("drive.base_url must not be empty");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "workflows@localhost".to_string(),
        }
    }
}

impl SmtpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("smtp.host must not be empty");
        }
        if self.from.is_empty() {
            bail!("smtp.from must not be empty");
        }
        Ok(())
    }
}
