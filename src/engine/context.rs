use crate::models::NodeOutput;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// Pattern: {{var.name}} or {{node.<id>.<field path>}}
static INTERPOLATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Invalid regex"));

/// Per-node input bundle assembled by the engine before invoking a component.
///
/// Holds the node's static config after template interpolation, the outputs
/// of every node executed so far in this run (whole-history visibility, in
/// execution order), and run-scoped variables. Components receive a shared
/// reference and must not retain it past their own execution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub instance_id: String,
    pub node_id: String,
    /// Resolved node configuration (templates already interpolated).
    pub config: Value,
    /// Outputs of already-executed nodes, oldest first. Each node id appears
    /// at most once.
    previous_outputs: Vec<(String, NodeOutput)>,
    variables: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(
        instance_id: &str,
        node_id: &str,
        config: Value,
        previous_outputs: Vec<(String, NodeOutput)>,
        variables: Map<String, Value>,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            node_id: node_id.to_string(),
            config,
            previous_outputs,
            variables,
        }
    }

    /// Output of one upstream node, if it has executed.
    pub fn output_of(&self, node_id: &str) -> Option<&NodeOutput> {
        self.previous_outputs
            .iter()
            .find(|(id, _)| id == node_id)
            .map(|(_, output)| output)
    }

    /// All upstream outputs in execution order.
    pub fn outputs(&self) -> &[(String, NodeOutput)] {
        &self.previous_outputs
    }

    /// Upstream outputs newest-first, the scan order used when a component
    /// searches the whole run history for usable data.
    pub fn outputs_newest_first(&self) -> impl Iterator<Item = (&str, &NodeOutput)> {
        self.previous_outputs
            .iter()
            .rev()
            .map(|(id, output)| (id.as_str(), output))
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn config_str(&self, field: &str) -> Option<&str> {
        self.config.get(field).and_then(|v| v.as_str())
    }

    pub fn require_config_str(&self, field: &str) -> Result<&str, crate::error::EngineError> {
        self.config_str(field).ok_or_else(|| {
            crate::error::EngineError::Component(format!(
                "node {}: missing required config field '{}'",
                self.node_id, field
            ))
        })
    }

    /// Replace `{{...}}` templates in a value with data from this context.
    /// Unresolvable templates are left untouched.
    pub fn interpolate_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => {
                let mut result = s.clone();

                for cap in INTERPOLATION_REGEX.captures_iter(s) {
                    if let Some(var_path) = cap.get(1)
                        && let Some(replacement) = self.resolve_path(var_path.as_str())
                    {
                        let replacement_str = match &replacement {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        result = result.replace(&cap[0], &replacement_str);
                    }
                }

                Value::String(result)
            }
            Value::Object(map) => {
                let mut new_map = Map::new();
                for (k, v) in map {
                    new_map.insert(k.clone(), self.interpolate_value(v));
                }
                Value::Object(new_map)
            }
            Value::Array(arr) => {
                Value::Array(arr.iter().map(|v| self.interpolate_value(v)).collect())
            }
            _ => value.clone(),
        }
    }

    /// Interpolate a template against one upstream record instead of the
    /// whole context. Used for per-row prompt fan-out: `{{field}}` resolves
    /// against the record's own keys first, then falls back to context paths.
    pub fn interpolate_with_record(&self, template: &str, record: &Map<String, Value>) -> String {
        let mut result = template.to_string();

        for cap in INTERPOLATION_REGEX.captures_iter(template) {
            if let Some(path) = cap.get(1) {
                let resolved = record
                    .get(path.as_str().trim())
                    .cloned()
                    .or_else(|| self.resolve_path(path.as_str()));
                if let Some(value) = resolved {
                    let replacement = match &value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    result = result.replace(&cap[0], &replacement);
                }
            }
        }

        result
    }

    fn resolve_path(&self, path: &str) -> Option<Value> {
        let parts: Vec<&str> = path.trim().split('.').collect();

        match parts.as_slice() {
            ["var", name, rest @ ..] => {
                let root = self.variables.get(*name)?;
                Self::navigate_nested(root, rest)
            }
            ["node", id, rest @ ..] => {
                let output = self.output_of(id)?;
                let root = serde_json::to_value(output).ok()?;
                Self::navigate_nested(&root, rest)
            }
            _ => None,
        }
    }

    /// Walk a dotted path into a value. Numeric segments index into arrays.
    fn navigate_nested(mut current: &Value, parts: &[&str]) -> Option<Value> {
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(*part)?,
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}
