use super::{MailTransport, SendOutcome};
use crate::config::SmtpConfig;
use crate::error::IntegrationError;
use async_trait::async_trait;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

/// SMTP-backed mail transport built from engine configuration.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, IntegrationError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| IntegrationError::Transport(format!("invalid from address: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| IntegrationError::Transport(format!("relay setup failed: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    fn parse_recipients(addresses: &[String]) -> Result<Vec<Mailbox>, IntegrationError> {
        addresses
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<Mailbox>().map_err(|e| {
                    IntegrationError::Transport(format!("invalid email address '{}': {}", s, e))
                })
            })
            .collect()
    }

    /// Extract the provider-supplied identifier from an SMTP response, if
    /// the server reports one in "queued as <id>" form.
    fn extract_message_identifier(response: &Response) -> Option<String> {
        let message = response
            .message()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        if message.is_empty() {
            return None;
        }

        const QUEUED_AS: &str = "queued as";
        if let Some(idx) = message.to_lowercase().find(QUEUED_AS) {
            let remainder = message[idx + QUEUED_AS.len()..].trim();
            if let Some(raw_id) = remainder.split_whitespace().next() {
                let cleaned =
                    raw_id.trim_matches(|c: char| matches!(c, '<' | '>' | '"' | '\'' | ';' | '.'));
                if !cleaned.is_empty() {
                    return Some(cleaned.to_string());
                }
            }
        }

        Some(message)
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<SendOutcome, IntegrationError> {
        let recipients = Self::parse_recipients(to)?;
        if recipients.is_empty() {
            return Err(IntegrationError::Transport(
                "no valid recipients".to_string(),
            ));
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in recipients {
            builder = builder.to(recipient);
        }

        let message = builder
            .body(body.to_string())
            .map_err(|e| IntegrationError::Transport(format!("failed to build message: {e}")))?;

        debug!(recipients = to.len(), subject = %subject, "Sending report email");

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;

        Ok(SendOutcome {
            message_id: Self::extract_message_identifier(&response),
        })
    }
}
