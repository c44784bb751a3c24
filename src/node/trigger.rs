use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::models::{NodeOutput, TriggerOutput};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Synchronous entry point for manual runs. No external call: the configured
/// `trigger_data` is passed through as the node's output.
pub struct ManualTriggerComponent;

#[async_trait]
impl Component for ManualTriggerComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "manual_trigger".to_string(),
            label: "Manual Trigger".to_string(),
            description: "Starts a run when the user requests execution".to_string(),
            parameters: vec![ParameterSpec::optional(
                "trigger_data",
                ParameterKind::Json,
                Some(json!({})),
            )],
            inputs: vec![],
            outputs: vec![SocketSpec::new("payload", "Static trigger payload")],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let payload = context
            .config
            .get("trigger_data")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        Ok(ExecutionResult::success(NodeOutput::Trigger(TriggerOutput {
            triggered_at: chrono::Utc::now().timestamp_millis(),
            payload,
        }))
        .with_log("manual trigger fired"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn context(config: Value) -> ExecutionContext {
        ExecutionContext::new("inst-1", "t1", config, vec![], Map::new())
    }

    #[tokio::test]
    async fn returns_configured_payload() {
        let component = ManualTriggerComponent;
        let result = component
            .execute(&context(json!({"trigger_data": {"source": "button"}})))
            .await
            .unwrap();

        assert!(result.success);
        let output = result.output.unwrap();
        let trigger = output.as_trigger().unwrap();
        assert_eq!(trigger.payload["source"], "button");
        assert!(trigger.triggered_at > 0);
    }

    #[tokio::test]
    async fn defaults_to_empty_payload() {
        let component = ManualTriggerComponent;
        let result = component.execute(&context(json!({}))).await.unwrap();

        let output = result.output.unwrap();
        assert_eq!(output.as_trigger().unwrap().payload, json!({}));
    }
}
