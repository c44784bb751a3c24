use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::Integrations;
use crate::models::NodeType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The single capability every node type implements.
///
/// Components must not mutate the context they receive. A recoverable failure
/// is reported through `ExecutionResult { success: false, .. }`; an `Err`
/// return is treated by the scheduler as a component-internal error and
/// converted to a failed step rather than aborting the run.
#[async_trait]
pub trait Component: Send + Sync {
    /// User-facing metadata for the graph editor.
    fn spec(&self) -> ComponentSpec;

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError>;
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Component")
    }
}

/// Introspectable component metadata: declared parameters plus named
/// input/output sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub type_name: String,
    pub label: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub inputs: Vec<SocketSpec>,
    pub outputs: Vec<SocketSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ParameterKind, default: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            default,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketSpec {
    pub name: String,
    pub description: String,
}

impl SocketSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Catalog mapping node types to component implementations.
///
/// Constructed explicitly and passed by reference so the scheduler stays
/// generic over the contract and tests can substitute fake components.
pub struct ComponentRegistry {
    components: HashMap<NodeType, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// Registry wired with the six built-in components over the given
    /// integration bundle.
    pub fn with_defaults(integrations: Integrations) -> Self {
        use crate::node::{
            ai::AiGenerateComponent, email::EmailReportComponent, file_write::FileWriteComponent,
            sheet_read::SheetReadComponent, sheet_write::SheetWriteComponent,
            trigger::ManualTriggerComponent,
        };

        let mut registry = Self::new();
        registry.register(NodeType::ManualTrigger, Arc::new(ManualTriggerComponent));
        registry.register(
            NodeType::SheetRead,
            Arc::new(SheetReadComponent::new(integrations.tabular.clone())),
        );
        registry.register(
            NodeType::SheetWrite,
            Arc::new(SheetWriteComponent::new(integrations.tabular.clone())),
        );
        registry.register(
            NodeType::AiGenerate,
            Arc::new(AiGenerateComponent::new(integrations.ai.clone())),
        );
        registry.register(
            NodeType::FileWrite,
            Arc::new(FileWriteComponent::new(integrations.files.clone())),
        );
        registry.register(
            NodeType::EmailReport,
            Arc::new(EmailReportComponent::new(integrations.mail.clone())),
        );
        registry
    }

    pub fn register(&mut self, node_type: NodeType, component: Arc<dyn Component>) {
        self.components.insert(node_type, component);
    }

    pub fn get(&self, node_type: &NodeType) -> Result<Arc<dyn Component>, EngineError> {
        self.components
            .get(node_type)
            .cloned()
            .ok_or_else(|| EngineError::UnknownComponentType(node_type.to_string()))
    }

    pub fn describe(&self, node_type: &NodeType) -> Result<ComponentSpec, EngineError> {
        Ok(self.get(node_type)?.spec())
    }

    /// Metadata for every registered component, for the editor's palette.
    pub fn specs(&self) -> Vec<ComponentSpec> {
        let mut specs: Vec<ComponentSpec> =
            self.components.values().map(|c| c.spec()).collect();
        specs.sort_by(|a, b| a.type_name.cmp(&b.type_name));
        specs
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeOutput, TriggerOutput};
    use serde_json::json;

    struct StubComponent;

    #[async_trait]
    impl Component for StubComponent {
        fn spec(&self) -> ComponentSpec {
            ComponentSpec {
                type_name: "stub".to_string(),
                label: "Stub".to_string(),
                description: "test double".to_string(),
                parameters: vec![ParameterSpec::optional(
                    "payload",
                    ParameterKind::Json,
                    Some(json!({})),
                )],
                inputs: vec![],
                outputs: vec![SocketSpec::new("output", "stub output")],
            }
        }

        async fn execute(
            &self,
            _context: &ExecutionContext,
        ) -> Result<ExecutionResult, EngineError> {
            Ok(ExecutionResult::success(NodeOutput::Trigger(
                TriggerOutput {
                    triggered_at: 0,
                    payload: json!({}),
                },
            )))
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = ComponentRegistry::new();
        let err = registry.get(&NodeType::SheetRead).unwrap_err();
        assert!(matches!(err, EngineError::UnknownComponentType(_)));
        assert!(err.to_string().contains("sheet_read"));
    }

    #[test]
    fn register_and_describe() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(StubComponent));

        assert_eq!(registry.len(), 1);
        let spec = registry.describe(&NodeType::ManualTrigger).unwrap();
        assert_eq!(spec.type_name, "stub");
        assert_eq!(spec.outputs.len(), 1);
    }

    #[tokio::test]
    async fn registered_component_executes() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(StubComponent));

        let context = ExecutionContext::new(
            "inst-1",
            "t1",
            json!({}),
            vec![],
            serde_json::Map::new(),
        );
        let component = registry.get(&NodeType::ManualTrigger).unwrap();
        let result = component.execute(&context).await.unwrap();
        assert!(result.success);
    }
}
