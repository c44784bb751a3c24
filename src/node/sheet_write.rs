use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::TabularStore;
use crate::models::{NodeOutput, WriteMode, WriteReport, WriteStatus};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_RANGE: &str = "A1";

/// What to do when the external write call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Report the step as successful with a simulated write, recording the
    /// attempted payload and the underlying error in the step logs. This is
    /// the historical behavior; it keeps partial workflows completing at the
    /// cost of masking integration failures from the run-level status.
    Simulate,
    /// Fail the step and surface the integration error.
    Fail,
}

impl WriteFailurePolicy {
    fn from_config(value: Option<&str>) -> Self {
        match value {
            Some("fail") => WriteFailurePolicy::Fail,
            _ => WriteFailurePolicy::Simulate,
        }
    }
}

/// Writes rows to the external tabular store.
///
/// Rows are resolved in order from (1) an explicit `data` matrix in the
/// node's own config, then (2) the whole run history, newest output first,
/// taking the first output that carries tabular data. The whole-history scan
/// is deliberate: a write node may consume rows from any upstream node, not
/// just its direct predecessor.
pub struct SheetWriteComponent {
    store: Arc<dyn TabularStore>,
}

impl SheetWriteComponent {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    fn resolve_rows(context: &ExecutionContext) -> Option<(Vec<Vec<Value>>, String)> {
        if let Some(Value::Array(rows)) = context.config.get("data") {
            let matrix: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.as_array().cloned().unwrap_or_else(|| vec![row.clone()]))
                .collect();
            if !matrix.is_empty() {
                return Some((matrix, "own config".to_string()));
            }
        }

        for (node_id, output) in context.outputs_newest_first() {
            if let Some(rows) = output.rows_for_write() {
                return Some((rows.to_vec(), format!("output of node {node_id}")));
            }
        }

        None
    }

    fn parse_mode(context: &ExecutionContext) -> Result<WriteMode, EngineError> {
        match context.config_str("mode") {
            None | Some("append") => Ok(WriteMode::Append),
            Some("overwrite") => Ok(WriteMode::Overwrite),
            Some(other) => Err(EngineError::Component(format!(
                "node {}: unknown write mode '{}'",
                context.node_id, other
            ))),
        }
    }
}

#[async_trait]
impl Component for SheetWriteComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "sheet_write".to_string(),
            label: "Sheet Write".to_string(),
            description: "Writes rows to a spreadsheet range".to_string(),
            parameters: vec![
                ParameterSpec::required("locator", ParameterKind::String),
                ParameterSpec::optional(
                    "range",
                    ParameterKind::String,
                    Some(json!(DEFAULT_RANGE)),
                ),
                ParameterSpec::optional("mode", ParameterKind::String, Some(json!("append"))),
                ParameterSpec::optional("data", ParameterKind::Json, None),
                ParameterSpec::optional(
                    "on_error",
                    ParameterKind::String,
                    Some(json!("simulate")),
                ),
            ],
            inputs: vec![SocketSpec::new("rows", "Tabular data from any upstream node")],
            outputs: vec![SocketSpec::new("report", "Write outcome")],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let locator = context.require_config_str("locator")?.to_string();
        let range = context.config_str("range").unwrap_or(DEFAULT_RANGE).to_string();
        let mode = Self::parse_mode(context)?;
        let policy = WriteFailurePolicy::from_config(context.config_str("on_error"));

        let Some((rows, source)) = Self::resolve_rows(context) else {
            return Ok(ExecutionResult::failure(
                "no rows to write: no 'data' in config and no upstream output carries tabular data",
            ));
        };

        debug!(locator = %locator, range = %range, rows = rows.len(), source = %source, "Sheet write");

        match self.store.write(&locator, &range, mode, &rows).await {
            Ok(outcome) => Ok(ExecutionResult::success(NodeOutput::Written(WriteReport {
                status: WriteStatus::Written,
                rows_written: outcome.rows_written,
                mode,
                range: outcome.updated_range.or(Some(range)),
            }))
            .with_log(format!(
                "wrote {} rows resolved from {}",
                outcome.rows_written, source
            ))),
            Err(err) => match policy {
                WriteFailurePolicy::Simulate => {
                    warn!(locator = %locator, error = %err, "Write failed, degrading to simulated success");
                    let payload = serde_json::to_string(&rows).unwrap_or_default();
                    Ok(ExecutionResult::success(NodeOutput::Written(WriteReport {
                        status: WriteStatus::Simulated,
                        rows_written: rows.len(),
                        mode,
                        range: Some(range),
                    }))
                    .with_log(format!("write to {locator} failed: {err}"))
                    .with_log(format!("simulated write of payload {payload}")))
                }
                WriteFailurePolicy::Fail => Ok(ExecutionResult::failure(format!(
                    "write to {locator} {range} failed: {err}"
                ))),
            },
        }
    }
}
