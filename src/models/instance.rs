use super::workflow::Workflow;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Draft,
    Running,
    Completed,
    Failed,
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceStatus::Completed | InstanceStatus::Failed)
    }
}

/// One concrete run of a workflow snapshot.
///
/// Instances copy the definition at creation time (`workflow`) and are
/// mutated only by the engine while running. `Completed` and `Failed` are
/// terminal; re-execution means creating a new instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: String,
    /// The definition this instance was created from, if any. Ad hoc
    /// instances carry their graph inline with no originating template.
    pub template_id: Option<String>,
    pub name: String,
    pub workflow: Workflow,
    pub status: InstanceStatus,
    /// Accumulated node outputs keyed by node id, set when the run finishes.
    pub output_data: Map<String, Value>,
    pub error_message: Option<String>,
    /// Run-scoped variables available to `{{var.*}}` templates.
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WorkflowInstance {
    pub fn new(name: String, workflow: Workflow, template_id: Option<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            template_id,
            name,
            workflow,
            status: InstanceStatus::Draft,
            output_data: Map::new(),
            error_message: None,
            variables: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn mark_running(&mut self) {
        self.status = InstanceStatus::Running;
        self.touch();
    }

    pub fn mark_completed(&mut self, output_data: Map<String, Value>) {
        self.status = InstanceStatus::Completed;
        self.output_data = output_data;
        self.error_message = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, output_data: Map<String, Value>, error: String) {
        self.status = InstanceStatus::Failed;
        self.output_data = output_data;
        self.error_message = Some(error);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp_millis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_workflow() -> Workflow {
        Workflow {
            id: "wf-1".to_string(),
            name: "empty".to_string(),
            nodes: vec![],
            edges: vec![],
        }
    }

    #[test]
    fn new_instance_starts_as_draft() {
        let instance = WorkflowInstance::new("run".to_string(), empty_workflow(), None);
        assert_eq!(instance.status, InstanceStatus::Draft);
        assert!(!instance.status.is_terminal());
        assert!(instance.output_data.is_empty());
        assert!(instance.template_id.is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(InstanceStatus::Completed.is_terminal());
        assert!(InstanceStatus::Failed.is_terminal());
        assert!(!InstanceStatus::Running.is_terminal());
        assert!(!InstanceStatus::Draft.is_terminal());
    }

    #[test]
    fn mark_failed_records_error() {
        let mut instance = WorkflowInstance::new("run".to_string(), empty_workflow(), None);
        instance.mark_running();
        assert_eq!(instance.status, InstanceStatus::Running);

        instance.mark_failed(Map::new(), "node r1: boom".to_string());
        assert_eq!(instance.status, InstanceStatus::Failed);
        assert_eq!(instance.error_message.as_deref(), Some("node r1: boom"));
    }
}
