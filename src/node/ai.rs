use crate::engine::context::ExecutionContext;
use crate::engine::result::ExecutionResult;
use crate::error::EngineError;
use crate::integrations::{AiProvider, GenerateOptions};
use crate::models::{AiOutput, AiRowResult, NodeOutput};
use crate::node::registry::{Component, ComponentSpec, ParameterKind, ParameterSpec, SocketSpec};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

// Paired reasoning-markup blocks some providers emit before the answer.
static REASONING_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("Invalid regex"));

const DEFAULT_ROW_LIMIT: usize = 50;

/// Sends a prompt (templated with upstream field values) to the configured
/// provider. When upstream rows exist, fans out one generation per record and
/// emits `results_for_sheets`, a header-plus-rows projection a downstream
/// tabular write can consume directly.
pub struct AiGenerateComponent {
    provider: Arc<dyn AiProvider>,
}

impl AiGenerateComponent {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Strip provider reasoning markup and surrounding whitespace.
    pub fn clean_response(raw: &str) -> String {
        REASONING_BLOCK_REGEX.replace_all(raw, "").trim().to_string()
    }

    fn options_from_config(context: &ExecutionContext) -> GenerateOptions {
        let defaults = GenerateOptions::default();
        GenerateOptions {
            model: context
                .config_str("model")
                .map(|s| s.to_string())
                .unwrap_or(defaults.model),
            temperature: context
                .config
                .get("temperature")
                .and_then(|v| v.as_f64())
                .unwrap_or(defaults.temperature),
            max_tokens: context
                .config
                .get("max_tokens")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32)
                .unwrap_or(defaults.max_tokens),
        }
    }

    /// Newest upstream output carrying keyed records, if any.
    fn upstream_records(context: &ExecutionContext) -> Option<Vec<serde_json::Map<String, Value>>> {
        context
            .outputs_newest_first()
            .find_map(|(_, output)| output.as_rows())
            .filter(|rows| !rows.records.is_empty())
            .map(|rows| rows.records.clone())
    }
}

#[async_trait]
impl Component for AiGenerateComponent {
    fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            type_name: "ai_generate".to_string(),
            label: "AI Generate".to_string(),
            description: "Generates text from a templated prompt, per upstream row when rows exist"
                .to_string(),
            parameters: vec![
                ParameterSpec::required("prompt", ParameterKind::String),
                ParameterSpec::optional("model", ParameterKind::String, None),
                ParameterSpec::optional("temperature", ParameterKind::Number, Some(json!(0.7))),
                ParameterSpec::optional("max_tokens", ParameterKind::Number, Some(json!(1024))),
                ParameterSpec::optional(
                    "row_limit",
                    ParameterKind::Number,
                    Some(json!(DEFAULT_ROW_LIMIT)),
                ),
            ],
            inputs: vec![SocketSpec::new("records", "Optional upstream rows to fan out over")],
            outputs: vec![
                SocketSpec::new("response", "Cleaned response text"),
                SocketSpec::new("results_for_sheets", "Header and rows for a tabular write"),
            ],
        }
    }

    async fn execute(&self, context: &ExecutionContext) -> Result<ExecutionResult, EngineError> {
        let template = context.require_config_str("prompt")?.to_string();
        let options = Self::options_from_config(context);
        let row_limit = context
            .config
            .get("row_limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_ROW_LIMIT);

        let mut logs = Vec::new();

        let records = Self::upstream_records(context).unwrap_or_default();
        if records.is_empty() {
            // Single-shot generation: interpolate the prompt against the
            // whole context.
            let prompt = match context.interpolate_value(&Value::String(template)) {
                Value::String(s) => s,
                other => other.to_string(),
            };

            let raw = match self.provider.generate(&prompt, &options).await {
                Ok(raw) => raw,
                Err(err) => {
                    return Ok(ExecutionResult::failure(format!("generation failed: {err}")));
                }
            };

            let response = Self::clean_response(&raw);
            debug!(model = %options.model, chars = response.len(), "Generation finished");

            return Ok(ExecutionResult::success(NodeOutput::Ai(AiOutput {
                response,
                model: options.model,
                results: Vec::new(),
                results_for_sheets: Vec::new(),
            }))
            .with_log("generated single response".to_string()));
        }

        // Per-row fan-out over upstream records.
        let limited = records.len().min(row_limit);
        if limited < records.len() {
            logs.push(format!(
                "row_limit {} capped {} upstream records",
                row_limit,
                records.len()
            ));
        }

        let mut results = Vec::with_capacity(limited);
        let mut failures = Vec::new();

        for (index, record) in records.into_iter().take(limited).enumerate() {
            let prompt = context.interpolate_with_record(&template, &record);
            match self.provider.generate(&prompt, &options).await {
                Ok(raw) => {
                    results.push(AiRowResult {
                        row_index: index,
                        input: record,
                        response: Self::clean_response(&raw),
                    });
                }
                Err(err) => {
                    logs.push(format!("row {index}: generation failed: {err}"));
                    failures.push(index);
                }
            }
        }

        if results.is_empty() {
            return Ok(ExecutionResult::failure("generation failed for every row").with_logs(logs));
        }

        // Header row from the first record's fields, plus the response column.
        let field_names: Vec<String> = results[0].input.keys().cloned().collect();
        let mut results_for_sheets = Vec::with_capacity(results.len() + 1);
        let mut header: Vec<Value> = field_names.iter().map(|f| json!(f)).collect();
        header.push(json!("ai_response"));
        results_for_sheets.push(header);

        for row in &results {
            let mut cells: Vec<Value> = field_names
                .iter()
                .map(|f| row.input.get(f).cloned().unwrap_or(Value::Null))
                .collect();
            cells.push(json!(row.response));
            results_for_sheets.push(cells);
        }

        logs.push(format!(
            "generated {} row results ({} failures)",
            results.len(),
            failures.len()
        ));

        let combined = results
            .iter()
            .map(|r| r.response.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let output = NodeOutput::Ai(AiOutput {
            response: combined,
            model: options.model,
            results,
            results_for_sheets,
        });

        if failures.is_empty() {
            Ok(ExecutionResult::success(output).with_logs(logs))
        } else {
            // Partial progress still flows downstream.
            Ok(ExecutionResult::failure_with_output(
                format!("generation failed for rows {failures:?}"),
                output,
            )
            .with_logs(logs))
        }
    }
}
