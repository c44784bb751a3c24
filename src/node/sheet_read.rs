use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::TabularStore;
use crate::models::{NodeOutput, RowsOutput};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_RANGE: &str = "A1:Z1000";

/// Reads a cell range from the external tabular store and exposes it both as
/// a raw matrix and as a keyed-record projection (first row as field names).
/// Nothing is fabricated on failure: an integration error fails the step.
pub struct SheetReadComponent {
    store: Arc<dyn TabularStore>,
}

impl SheetReadComponent {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Component for SheetReadComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "sheet_read".to_string(),
            label: "Sheet Read".to_string(),
            description: "Reads rows from a spreadsheet range".to_string(),
            parameters: vec![
                ParameterSpec::required("locator", ParameterKind::String),
                ParameterSpec::optional(
                    "range",
                    ParameterKind::String,
                    Some(json!(DEFAULT_RANGE)),
                ),
            ],
            inputs: vec![SocketSpec::new("trigger", "Upstream trigger")],
            outputs: vec![
                SocketSpec::new("values", "Raw cell matrix"),
                SocketSpec::new("records", "Rows keyed by header fields"),
            ],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let locator = context.require_config_str("locator")?;
        let range = context.config_str("range").unwrap_or(DEFAULT_RANGE);

        if !self.store.authenticate().await? {
            return Ok(ExecutionResult::failure(format!(
                "tabular store rejected authentication for {locator}"
            )));
        }

        let values = match self.store.read(locator, range).await {
            Ok(values) => values,
            Err(err) => {
                return Ok(ExecutionResult::failure(format!(
                    "read from {locator} {range} failed: {err}"
                )));
            }
        };

        debug!(locator = %locator, range = %range, rows = values.len(), "Sheet read");
        let row_count = values.len();
        let output = RowsOutput::from_matrix(values, Some(range.to_string()));

        Ok(ExecutionResult::success(NodeOutput::Rows(output))
            .with_log(format!("read {row_count} rows from {locator} {range}")))
    }
}
