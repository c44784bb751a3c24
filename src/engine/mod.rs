pub mod context;
pub mod executor;
pub mod graph;
pub mod result;

pub use context::ExecutionContext;
pub use executor::WorkflowEngine;
pub use graph::WorkflowGraph;
pub use result::ExecutionResult;
