use super::{AiProvider, GenerateOptions};
use crate::error::IntegrationError;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// AI provider speaking the OpenAI-compatible chat completions protocol.
/// Works against any endpoint exposing `POST {base_url}/chat/completions`.
pub struct HttpAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpAiProvider {
    pub fn new(base_url: String, api_key: String) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IntegrationError::Http(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, IntegrationError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %options.model, prompt_len = prompt.len(), "Sending generation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": options.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": options.temperature,
                "max_tokens": options.max_tokens,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| IntegrationError::Provider(format!("invalid response body: {e}")))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown provider error");
            return Err(IntegrationError::Provider(format!(
                "{status}: {message}"
            )));
        }

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                IntegrationError::Provider("response carried no completion text".to_string())
            })
    }
}
