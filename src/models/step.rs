use super::node::NodeType;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Persisted record of one node's execution within one instance run.
///
/// Created when the node starts, finalized exactly once when it returns.
/// The sequence number preserves execution order for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub id: String,
    pub instance_id: String,
    pub node_id: String,
    pub step_type: NodeType,
    /// Order of execution within the run, starting at 0.
    pub sequence: u32,
    /// Resolved input the component actually saw (static config after
    /// template interpolation).
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub status: StepStatus,
    pub error_message: Option<String>,
    pub logs: Vec<String>,
    pub execution_time_ms: u64,
    pub created_at: i64,
}

impl ExecutionStep {
    pub fn start(
        instance_id: &str,
        node_id: &str,
        step_type: NodeType,
        sequence: u32,
        input_data: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            node_id: node_id.to_string(),
            step_type,
            sequence,
            input_data,
            output_data: None,
            status: StepStatus::Running,
            error_message: None,
            logs: Vec::new(),
            execution_time_ms: 0,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn complete(&mut self, output_data: Option<Value>, logs: Vec<String>, elapsed_ms: u64) {
        self.status = StepStatus::Completed;
        self.output_data = output_data;
        self.logs = logs;
        self.execution_time_ms = elapsed_ms;
    }

    pub fn fail(
        &mut self,
        error: String,
        output_data: Option<Value>,
        logs: Vec<String>,
        elapsed_ms: u64,
    ) {
        self.status = StepStatus::Failed;
        self.error_message = Some(error);
        self.output_data = output_data;
        self.logs = logs;
        self.execution_time_ms = elapsed_ms;
    }
}
