use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::MailTransport;
use crate::models::{EmailOutput, NodeOutput};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_SUBJECT: &str = "Workflow execution report";

/// Terminal sink: formats a run summary from the whole-history outputs and
/// sends it through the mail transport. Nothing runs downstream of it.
pub struct EmailReportComponent {
    transport: Arc<dyn MailTransport>,
}

impl EmailReportComponent {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    fn recipients(context: &ExecutionContext) -> Result<Vec<String>, EngineError> {
        let to = context.config.get("to").ok_or_else(|| {
            EngineError::Component(format!(
                "node {}: missing required config field 'to'",
                context.node_id
            ))
        })?;

        let recipients: Vec<String> = match to {
            Value::String(s) => s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect(),
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        if recipients.is_empty() {
            return Err(EngineError::Component(format!(
                "node {}: 'to' resolved to no recipients",
                context.node_id
            )));
        }
        Ok(recipients)
    }

    /// Per-node summary lines for every upstream output, in execution order.
    fn render_summary(context: &ExecutionContext) -> String {
        let mut lines = vec![format!("Run {} summary:", context.instance_id)];
        for (node_id, output) in context.outputs() {
            lines.push(format!("- {}: {}", node_id, output.summary()));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Component for EmailReportComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "email_report".to_string(),
            label: "Email Report".to_string(),
            description: "Emails an execution summary; terminal sink".to_string(),
            parameters: vec![
                ParameterSpec::required("to", ParameterKind::String),
                ParameterSpec::optional(
                    "subject",
                    ParameterKind::String,
                    Some(Value::String(DEFAULT_SUBJECT.to_string())),
                ),
                ParameterSpec::optional("body", ParameterKind::String, None),
            ],
            inputs: vec![SocketSpec::new("summary", "Whole-run outputs")],
            outputs: vec![SocketSpec::new("receipt", "Send outcome")],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let recipients = Self::recipients(context)?;
        let subject = context
            .config_str("subject")
            .unwrap_or(DEFAULT_SUBJECT)
            .to_string();

        // An explicit body template wins over the generated summary.
        let body = match context.config.get("body") {
            Some(body) => match context.interpolate_value(body) {
                Value::String(s) => s,
                other => other.to_string(),
            },
            None => Self::render_summary(context),
        };

        debug!(recipients = recipients.len(), subject = %subject, "Sending execution report");

        match self.transport.send(&recipients, &subject, &body).await {
            Ok(outcome) => Ok(ExecutionResult::success(NodeOutput::Email(EmailOutput {
                sent_at: chrono::Utc::now().timestamp_millis(),
                recipients: recipients.clone(),
                subject,
                message_id: outcome.message_id,
            }))
            .with_log(format!("report sent to {} recipients", recipients.len()))
            .terminal()),
            Err(err) => Ok(ExecutionResult::failure(format!("send failed: {err}")).terminal()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrationError;
    use crate::integrations::SendOutcome;
    use crate::models::{RowsOutput, TriggerOutput};
    use serde_json::{Map, json};
    use std::sync::Mutex;

    struct CapturingTransport {
        fail: bool,
        sent: Mutex<Vec<(Vec<String>, String, String)>>,
    }

    #[async_trait]
    impl MailTransport for CapturingTransport {
        async fn send(
            &self,
            to: &[String],
            subject: &str,
            body: &str,
        ) -> Result<SendOutcome, IntegrationError> {
            if self.fail {
                return Err(IntegrationError::Transport("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push((
                to.to_vec(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(SendOutcome {
                message_id: Some("msg-1".to_string()),
            })
        }
    }

    fn transport(fail: bool) -> Arc<CapturingTransport> {
        Arc::new(CapturingTransport {
            fail,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn outputs() -> Vec<(String, NodeOutput)> {
        vec![
            (
                "t1".to_string(),
                NodeOutput::Trigger(TriggerOutput {
                    triggered_at: 5,
                    payload: json!({}),
                }),
            ),
            (
                "r1".to_string(),
                NodeOutput::Rows(RowsOutput::from_matrix(
                    vec![vec![json!("h")], vec![json!("x")]],
                    None,
                )),
            ),
        ]
    }

    fn context(config: Value, outputs: Vec<(String, NodeOutput)>) -> ExecutionContext {
        ExecutionContext::new("inst-9", "e1", config, outputs, Map::new())
    }

    #[tokio::test]
    async fn sends_generated_summary() {
        let transport = transport(false);
        let component = EmailReportComponent::new(transport.clone());

        let result = component
            .execute(&context(json!({"to": "ops@example.com"}), outputs()))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.next_steps, Some(vec![]));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].0, vec!["ops@example.com"]);
        assert_eq!(sent[0].1, DEFAULT_SUBJECT);
        assert!(sent[0].2.contains("inst-9"));
        assert!(sent[0].2.contains("r1: read 2 rows"));
    }

    #[tokio::test]
    async fn comma_separated_recipients() {
        let transport = transport(false);
        let component = EmailReportComponent::new(transport.clone());

        let result = component
            .execute(&context(
                json!({"to": "a@example.com, b@example.com", "subject": "weekly"}),
                vec![],
            ))
            .await
            .unwrap();

        assert!(result.success);
        let output = result.output.unwrap();
        if let NodeOutput::Email(email) = output {
            assert_eq!(email.recipients.len(), 2);
            assert_eq!(email.subject, "weekly");
            assert_eq!(email.message_id.as_deref(), Some("msg-1"));
        } else {
            panic!("Expected Email output");
        }
    }

    #[tokio::test]
    async fn transport_failure_fails_step_but_stays_terminal() {
        let component = EmailReportComponent::new(transport(true));

        let result = component
            .execute(&context(json!({"to": "ops@example.com"}), vec![]))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("connection refused"));
        assert_eq!(result.next_steps, Some(vec![]));
    }

    #[tokio::test]
    async fn missing_recipients_is_component_error() {
        let component = EmailReportComponent::new(transport(false));
        let err = component
            .execute(&context(json!({"to": ""}), vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("recipients"));
    }
}
