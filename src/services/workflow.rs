use crate::EngineCore;
use crate::models::{ExecutionStep, InstanceStatus, Workflow, WorkflowInstance};
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

// Instance lifecycle functions shared by every embedding of the engine.

/// Create a draft instance from a workflow definition. `input` becomes the
/// run variables visible to `{{var.*}}` templates.
pub async fn create_instance(
    core: &Arc<EngineCore>,
    workflow: Workflow,
    name: String,
    input: Option<Map<String, Value>>,
) -> Result<WorkflowInstance> {
    let mut instance = WorkflowInstance::new(name, workflow, None);
    if let Some(variables) = input {
        instance = instance.with_variables(variables);
    }

    core.storage
        .instances
        .create(&instance)
        .with_context(|| format!("Failed to save instance {}", instance.id))?;

    Ok(instance)
}

/// Final result of one run, trimmed down for callers that do not need the
/// full instance record.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub instance_id: String,
    pub status: InstanceStatus,
    pub output_data: Map<String, Value>,
    pub error_message: Option<String>,
}

/// Execute a draft instance to completion.
pub async fn execute_instance(
    core: &Arc<EngineCore>,
    instance_id: &str,
) -> Result<ExecutionOutcome> {
    let instance = core
        .engine
        .run(instance_id)
        .await
        .with_context(|| format!("Failed to execute instance {}", instance_id))?;

    Ok(ExecutionOutcome {
        instance_id: instance.id,
        status: instance.status,
        output_data: instance.output_data,
        error_message: instance.error_message,
    })
}

pub async fn get_instance(core: &Arc<EngineCore>, id: &str) -> Result<WorkflowInstance> {
    core.storage
        .instances
        .get(id)
        .with_context(|| format!("Failed to get instance {}", id))
}

pub async fn list_instances(core: &Arc<EngineCore>) -> Result<Vec<WorkflowInstance>> {
    core.storage
        .instances
        .list()
        .context("Failed to list instances")
}

/// Steps of one instance in execution order.
pub async fn get_steps(core: &Arc<EngineCore>, instance_id: &str) -> Result<Vec<ExecutionStep>> {
    core.storage
        .steps
        .list_for_instance(instance_id)
        .with_context(|| format!("Failed to list steps for instance {}", instance_id))
}
