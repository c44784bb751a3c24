use crate::models::NodeOutput;

/// Output bundle returned by a component and consumed by the scheduler.
///
/// `success = false` marks a recoverable per-node failure: the step is
/// recorded as failed but the run continues. `execution_time_ms` is stamped
/// by the engine after the component returns.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: Option<NodeOutput>,
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub execution_time_ms: u64,
    /// Hint for terminal sinks: `Some(vec![])` means nothing should run
    /// after this node as far as the component is concerned.
    pub next_steps: Option<Vec<String>>,
}

impl ExecutionResult {
    pub fn success(output: NodeOutput) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
            logs: Vec::new(),
            execution_time_ms: 0,
            next_steps: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            logs: Vec::new(),
            execution_time_ms: 0,
            next_steps: None,
        }
    }

    /// A failed result that still contributes partial output downstream.
    pub fn failure_with_output(error: impl Into<String>, output: NodeOutput) -> Self {
        Self {
            success: false,
            output: Some(output),
            error: Some(error.into()),
            logs: Vec::new(),
            execution_time_ms: 0,
            next_steps: None,
        }
    }

    pub fn with_log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }

    pub fn with_logs(mut self, lines: Vec<String>) -> Self {
        self.logs.extend(lines);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.next_steps = Some(Vec::new());
        self
    }
}
