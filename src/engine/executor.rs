use crate::engine::context::ExecutionContext;
use crate::engine::graph::WorkflowGraph;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::models::{ExecutionStep, Node, NodeOutput, WorkflowInstance};
use crate::node::registry::ComponentRegistry;
use crate::storage::Storage;
use serde_json::Map;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Drives one workflow instance from draft to a terminal state.
///
/// Execution is strictly sequential in topological order; one engine may be
/// shared across concurrently running instances because all per-run state
/// lives on the stack of `run`.
pub struct WorkflowEngine {
    storage: Arc<Storage>,
    registry: Arc<ComponentRegistry>,
}

impl WorkflowEngine {
    pub fn new(storage: Arc<Storage>, registry: Arc<ComponentRegistry>) -> Self {
        Self { storage, registry }
    }

    /// Execute the instance to completion and return its final record.
    ///
    /// Graph-level validation failures mark the instance failed before any
    /// step is created. Per-node failures are recorded on their steps and do
    /// not abort the run (best-effort policy): the instance ends failed with
    /// the concatenated node errors instead.
    pub async fn run(&self, instance_id: &str) -> Result<WorkflowInstance, EngineError> {
        let mut instance = self
            .storage
            .instances
            .get(instance_id)
            .map_err(|_| EngineError::InstanceNotFound(instance_id.to_string()))?;

        if instance.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                id: instance.id.clone(),
                status: instance.status,
            });
        }

        let order = match Self::plan(&instance.workflow) {
            Ok(order) => order,
            Err(err) if err.is_graph_error() => {
                error!(instance_id = %instance.id, error = %err, "Graph validation failed");
                instance.mark_failed(Map::new(), err.to_string());
                self.storage
                    .instances
                    .update(&instance)
                    .map_err(EngineError::storage)?;
                return Ok(instance);
            }
            Err(err) => return Err(err),
        };

        instance.mark_running();
        self.storage
            .instances
            .update(&instance)
            .map_err(EngineError::storage)?;

        info!(instance_id = %instance.id, nodes = order.len(), "Starting workflow run");

        let mut previous_outputs: Vec<(String, NodeOutput)> = Vec::new();
        let mut node_errors: Vec<String> = Vec::new();

        for (sequence, node_id) in order.iter().enumerate() {
            let node = instance
                .workflow
                .get_node(node_id)
                .expect("ordered node ids come from the workflow")
                .clone();

            let result = self
                .execute_node(&instance, &node, sequence as u32, &previous_outputs)
                .await?;

            if let Some(output) = result.output {
                // A failed node may still contribute partial output, so
                // downstream nodes are not strictly blocked by one failure.
                previous_outputs.push((node.id.clone(), output));
            }

            if !result.success {
                let message = result.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(instance_id = %instance.id, node_id = %node.id, error = %message, "Node failed, continuing run");
                node_errors.push(format!("node {}: {}", node.id, message));
            }
        }

        let mut output_data = Map::new();
        for (node_id, output) in &previous_outputs {
            output_data.insert(
                node_id.clone(),
                serde_json::to_value(output).map_err(EngineError::storage)?,
            );
        }

        if node_errors.is_empty() {
            info!(instance_id = %instance.id, "Workflow run completed");
            instance.mark_completed(output_data);
        } else {
            info!(instance_id = %instance.id, failures = node_errors.len(), "Workflow run finished with failures");
            instance.mark_failed(output_data, node_errors.join("; "));
        }

        self.storage
            .instances
            .update(&instance)
            .map_err(EngineError::storage)?;

        Ok(instance)
    }

    /// Validate the graph and compute the execution order. Runs before any
    /// step exists so cyclic or malformed graphs never execute partially.
    fn plan(workflow: &crate::models::Workflow) -> Result<Vec<String>, EngineError> {
        let graph = WorkflowGraph::new(workflow)?;
        graph.validate()?;
        graph.topological_order()
    }

    /// Execute one node: build its context, persist the running step, invoke
    /// the component, and finalize the step with the outcome. Component-level
    /// errors (unknown type, internal failure) are translated to a failed
    /// result here and never unwind into the run loop.
    async fn execute_node(
        &self,
        instance: &WorkflowInstance,
        node: &Node,
        sequence: u32,
        previous_outputs: &[(String, NodeOutput)],
    ) -> Result<ExecutionResult, EngineError> {
        debug!(instance_id = %instance.id, node_id = %node.id, node_type = %node.node_type, "Executing node");

        // Interpolate static config against the accumulated run history
        // before the component sees it.
        let mut context = ExecutionContext::new(
            &instance.id,
            &node.id,
            serde_json::Value::Null,
            previous_outputs.to_vec(),
            instance.variables.clone(),
        );
        context.config = context.interpolate_value(&node.config);

        let mut step = ExecutionStep::start(
            &instance.id,
            &node.id,
            node.node_type,
            sequence,
            context.config.clone(),
        );
        self.storage.steps.put(&step).map_err(EngineError::storage)?;

        let started = Instant::now();
        let mut result = match self.registry.get(&node.node_type) {
            Ok(component) => match component.execute(&context).await {
                Ok(result) => result,
                Err(err) => {
                    error!(node_id = %node.id, error = %err, "Component returned an internal error");
                    ExecutionResult::failure(err.to_string())
                }
            },
            Err(err) => ExecutionResult::failure(err.to_string()),
        };
        result.execution_time_ms = started.elapsed().as_millis() as u64;

        let output_value = match &result.output {
            Some(output) => Some(serde_json::to_value(output).map_err(EngineError::storage)?),
            None => None,
        };

        if result.success {
            step.complete(output_value, result.logs.clone(), result.execution_time_ms);
        } else {
            step.fail(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
                output_value,
                result.logs.clone(),
                result.execution_time_ms,
            );
        }
        self.storage.steps.put(&step).map_err(EngineError::storage)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::ExecutionContext;
    use crate::error::EngineError;
    use crate::models::{
        Edge, InstanceStatus, Node, NodeType, StepStatus, TriggerOutput, Workflow,
    };
    use crate::node::registry::{Component, ComponentSpec, SocketSpec};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    struct EchoComponent;

    #[async_trait]
    impl Component for EchoComponent {
        fn spec(&self) -> ComponentSpec {
            ComponentSpec {
                type_name: "echo".to_string(),
                label: "Echo".to_string(),
                description: "returns its config as trigger payload".to_string(),
                parameters: vec![],
                inputs: vec![],
                outputs: vec![SocketSpec::new("payload", "config echo")],
            }
        }

        async fn execute(
            &self,
            context: &ExecutionContext,
        ) -> Result<ExecutionResult, EngineError> {
            Ok(ExecutionResult::success(NodeOutput::Trigger(
                TriggerOutput {
                    triggered_at: 1,
                    payload: context.config.clone(),
                },
            )))
        }
    }

    struct FailingComponent;

    #[async_trait]
    impl Component for FailingComponent {
        fn spec(&self) -> ComponentSpec {
            ComponentSpec {
                type_name: "failing".to_string(),
                label: "Failing".to_string(),
                description: "always errors internally".to_string(),
                parameters: vec![],
                inputs: vec![],
                outputs: vec![],
            }
        }

        async fn execute(
            &self,
            _context: &ExecutionContext,
        ) -> Result<ExecutionResult, EngineError> {
            Err(EngineError::Component("deliberate defect".to_string()))
        }
    }

    fn node(id: &str, node_type: NodeType, config: serde_json::Value) -> Node {
        Node {
            id: id.to_string(),
            node_type,
            config,
            position: None,
        }
    }

    fn setup(registry: ComponentRegistry) -> (WorkflowEngine, Arc<Storage>, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("engine.db");
        let storage = Arc::new(Storage::new(db_path.to_str().unwrap()).unwrap());
        let engine = WorkflowEngine::new(storage.clone(), Arc::new(registry));
        (engine, storage, temp_dir)
    }

    fn create_instance(storage: &Storage, workflow: Workflow) -> String {
        let instance = WorkflowInstance::new("test run".to_string(), workflow, None);
        let id = instance.id.clone();
        storage.instances.create(&instance).unwrap();
        id
    }

    #[tokio::test]
    async fn completes_and_accumulates_outputs() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(EchoComponent));
        registry.register(NodeType::SheetRead, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "two step".to_string(),
            nodes: vec![
                node("a", NodeType::ManualTrigger, json!({"k": 1})),
                node("b", NodeType::SheetRead, json!({"k": 2})),
            ],
            edges: vec![Edge {
                from: "a".to_string(),
                to: "b".to_string(),
            }],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();

        assert_eq!(finished.status, InstanceStatus::Completed);
        assert!(finished.error_message.is_none());
        // Each executed node appears exactly once in the output map.
        assert_eq!(finished.output_data.len(), 2);
        assert!(finished.output_data.contains_key("a"));
        assert!(finished.output_data.contains_key("b"));

        let steps = storage.steps.list_for_instance(&id).unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|s| s.status == StepStatus::Completed));
        assert_eq!(steps[0].node_id, "a");
        assert_eq!(steps[1].node_id, "b");
    }

    #[tokio::test]
    async fn cyclic_graph_fails_with_zero_steps() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::SheetRead, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "cyclic".to_string(),
            nodes: vec![
                node("t", NodeType::ManualTrigger, json!({})),
                node("a", NodeType::SheetRead, json!({})),
                node("b", NodeType::SheetRead, json!({})),
            ],
            edges: vec![
                Edge {
                    from: "t".to_string(),
                    to: "a".to_string(),
                },
                Edge {
                    from: "a".to_string(),
                    to: "b".to_string(),
                },
                Edge {
                    from: "b".to_string(),
                    to: "a".to_string(),
                },
            ],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();

        assert_eq!(finished.status, InstanceStatus::Failed);
        assert!(finished.error_message.unwrap().contains("cycle"));
        assert_eq!(storage.steps.count_for_instance(&id).unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_node_id_fails_validation_with_zero_steps() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "duplicate ids".to_string(),
            nodes: vec![
                node("t", NodeType::ManualTrigger, json!({})),
                node("t", NodeType::ManualTrigger, json!({})),
            ],
            edges: vec![],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();

        assert_eq!(finished.status, InstanceStatus::Failed);
        assert!(finished.error_message.unwrap().contains("duplicate node id"));
        assert_eq!(storage.steps.count_for_instance(&id).unwrap(), 0);
    }

    #[tokio::test]
    async fn component_internal_error_becomes_failed_step_and_run_continues() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(EchoComponent));
        registry.register(NodeType::SheetRead, Arc::new(FailingComponent));
        registry.register(NodeType::SheetWrite, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "mid failure".to_string(),
            nodes: vec![
                node("t", NodeType::ManualTrigger, json!({})),
                node("bad", NodeType::SheetRead, json!({})),
                node("late", NodeType::SheetWrite, json!({})),
            ],
            edges: vec![
                Edge {
                    from: "t".to_string(),
                    to: "bad".to_string(),
                },
                Edge {
                    from: "bad".to_string(),
                    to: "late".to_string(),
                },
            ],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();

        // All three nodes ran despite the middle one failing.
        let steps = storage.steps.list_for_instance(&id).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].status, StepStatus::Failed);
        assert!(steps[1].error_message.as_ref().unwrap().contains("deliberate defect"));
        assert_eq!(steps[2].status, StepStatus::Completed);

        assert_eq!(finished.status, InstanceStatus::Failed);
        assert!(finished.error_message.unwrap().contains("node bad"));
        // The failed node contributed no output; the others did.
        assert_eq!(finished.output_data.len(), 2);
    }

    #[tokio::test]
    async fn unknown_component_type_is_a_failed_step() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "unknown type".to_string(),
            nodes: vec![
                node("t", NodeType::ManualTrigger, json!({})),
                node("x", NodeType::AiGenerate, json!({})),
            ],
            edges: vec![Edge {
                from: "t".to_string(),
                to: "x".to_string(),
            }],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();

        assert_eq!(finished.status, InstanceStatus::Failed);
        assert!(
            finished
                .error_message
                .unwrap()
                .contains("unknown component type")
        );

        let steps = storage.steps.list_for_instance(&id).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn terminal_instance_rejects_re_execution() {
        let mut registry = ComponentRegistry::new();
        registry.register(NodeType::ManualTrigger, Arc::new(EchoComponent));
        let (engine, storage, _dir) = setup(registry);

        let workflow = Workflow {
            id: "wf".to_string(),
            name: "single".to_string(),
            nodes: vec![node("t", NodeType::ManualTrigger, json!({}))],
            edges: vec![],
        };

        let id = create_instance(&storage, workflow);
        let finished = engine.run(&id).await.unwrap();
        assert_eq!(finished.status, InstanceStatus::Completed);

        let err = engine.run(&id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn missing_instance_is_an_error() {
        let (engine, _storage, _dir) = setup(ComponentRegistry::new());
        let err = engine.run("ghost").await.unwrap_err();
        assert!(matches!(err, EngineError::InstanceNotFound(_)));
    }
}
