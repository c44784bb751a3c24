mod instance;
mod node;
mod output;
mod step;
mod workflow;

pub use instance::{InstanceStatus, WorkflowInstance};
pub use node::{Edge, Node, NodeType, Position};
pub use output::{
    AiOutput, AiRowResult, EmailOutput, FileOutput, NodeOutput, RowsOutput, TriggerOutput,
    WriteMode, WriteReport, WriteStatus,
};
pub use step::{ExecutionStep, StepStatus};
pub use workflow::Workflow;
