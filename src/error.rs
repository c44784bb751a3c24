use crate::models::InstanceStatus;
use thiserror::Error;

/// Errors raised by one of the external integrations behind the engine's
/// outbound traits. Components decide per their own policy whether these are
/// fatal for the node or recoverable.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(err: reqwest::Error) -> Self {
        IntegrationError::Http(err.to_string())
    }
}

/// Engine-level error taxonomy.
///
/// Graph-level variants (`Validation`, `CyclicGraph`, `NoEntryPoint`) are
/// fatal and stop a run before any step is created. Per-node variants are
/// caught at the component boundary by the scheduler and recorded as failed
/// steps without aborting the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow validation failed: {0}")]
    Validation(String),

    #[error("workflow graph contains a cycle")]
    CyclicGraph,

    #[error("workflow graph has no entry point")]
    NoEntryPoint,

    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("component error: {0}")]
    Component(String),

    #[error("instance {0} not found")]
    InstanceNotFound(String),

    #[error("instance {id} is {status:?} and cannot be executed again")]
    InvalidTransition { id: String, status: InstanceStatus },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        EngineError::Storage(err.to_string())
    }

    pub fn component(err: impl std::fmt::Display) -> Self {
        EngineError::Component(err.to_string())
    }

    /// Graph-level errors abort a run before any step exists.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_) | EngineError::CyclicGraph | EngineError::NoEntryPoint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_are_classified() {
        assert!(EngineError::Validation("duplicate node id: a".to_string()).is_graph_error());
        assert!(EngineError::CyclicGraph.is_graph_error());
        assert!(EngineError::NoEntryPoint.is_graph_error());
    }

    #[test]
    fn per_node_and_infrastructure_errors_are_not() {
        assert!(!EngineError::UnknownComponentType("webhook".to_string()).is_graph_error());
        assert!(!EngineError::Component("boom".to_string()).is_graph_error());
        assert!(!EngineError::Storage("disk full".to_string()).is_graph_error());
        assert!(!EngineError::InstanceNotFound("inst-1".to_string()).is_graph_error());
    }
}
