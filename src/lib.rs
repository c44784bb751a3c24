pub mod config;
pub mod engine;
pub mod error;
pub mod integrations;
pub mod models;
pub mod node;
pub mod services;
pub mod storage;

pub use error::{EngineError, IntegrationError};
pub use models::*;

use crate::config::EngineConfig;
use crate::engine::WorkflowEngine;
use crate::integrations::Integrations;
use crate::node::ComponentRegistry;
use crate::storage::Storage;
use std::sync::Arc;
use tracing::info;

/// Core engine state shared by every entry point: storage handles, the
/// component registry, and the scheduler bound to both.
pub struct EngineCore {
    pub storage: Arc<Storage>,
    pub registry: Arc<ComponentRegistry>,
    pub engine: WorkflowEngine,
}

impl EngineCore {
    /// Open storage at `db_path` and wire the default component set against
    /// the given integration backends.
    pub fn new(db_path: &str, integrations: Integrations) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(db_path)?);
        let registry = Arc::new(ComponentRegistry::with_defaults(integrations));

        info!(components = registry.len(), "Initializing RelayFlow engine");

        let engine = WorkflowEngine::new(storage.clone(), registry.clone());
        Ok(Self {
            storage,
            registry,
            engine,
        })
    }

    /// Like `new` but with live HTTP/SMTP integrations built from config.
    pub fn from_config(db_path: &str, config: &EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Self::new(db_path, Integrations::from_config(config)?)
    }
}
