use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unified node output enum. Each variant corresponds to a component type's
/// output structure, replacing loosely-shaped maps with a tagged union so
/// downstream resolution is explicit instead of duck-typed key scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum NodeOutput {
    Trigger(TriggerOutput),
    Rows(RowsOutput),
    Written(WriteReport),
    Ai(AiOutput),
    File(FileOutput),
    Email(EmailOutput),
}

/// Manual trigger output: the configured payload plus when it fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerOutput {
    pub triggered_at: i64,
    pub payload: Value,
}

/// Tabular read output: the raw cell matrix and a keyed-record projection
/// built from the first row as field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowsOutput {
    pub values: Vec<Vec<Value>>,
    pub records: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl RowsOutput {
    /// Build the keyed-record projection from a raw matrix, treating the
    /// first row as the header. Short rows yield null for missing fields.
    pub fn from_matrix(values: Vec<Vec<Value>>, range: Option<String>) -> Self {
        let records = match values.split_first() {
            Some((header, rows)) => rows
                .iter()
                .map(|row| {
                    header
                        .iter()
                        .enumerate()
                        .map(|(i, field)| {
                            let key = match field {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (key, row.get(i).cloned().unwrap_or(Value::Null))
                        })
                        .collect()
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            values,
            records,
            range,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Append,
    Overwrite,
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Append
    }
}

/// Status reported by a tabular write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// The external store acknowledged the write.
    Written,
    /// The external call failed and the component degraded to recording the
    /// attempted payload instead of failing the step.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteReport {
    pub status: WriteStatus,
    pub rows_written: usize,
    pub mode: WriteMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

/// AI generation output: the cleaned response plus projections a downstream
/// tabular write can consume without bespoke glue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiOutput {
    pub response: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<AiRowResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results_for_sheets: Vec<Vec<Value>>,
}

/// One per-record generation when the AI component fans out over upstream rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRowResult {
    pub row_index: usize,
    pub input: Map<String, Value>,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutput {
    pub file_id: String,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailOutput {
    pub sent_at: i64,
    pub recipients: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl NodeOutput {
    pub fn as_rows(&self) -> Option<&RowsOutput> {
        match self {
            Self::Rows(output) => Some(output),
            _ => None,
        }
    }

    pub fn as_ai(&self) -> Option<&AiOutput> {
        match self {
            Self::Ai(output) => Some(output),
            _ => None,
        }
    }

    pub fn as_written(&self) -> Option<&WriteReport> {
        match self {
            Self::Written(output) => Some(output),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&TriggerOutput> {
        match self {
            Self::Trigger(output) => Some(output),
            _ => None,
        }
    }

    /// Rows this output can contribute to a downstream tabular write.
    ///
    /// This is the typed replacement for scanning loosely-shaped maps for a
    /// recognized "rows" key: only variants that genuinely carry tabular data
    /// answer here.
    pub fn rows_for_write(&self) -> Option<&[Vec<Value>]> {
        match self {
            Self::Rows(output) if !output.values.is_empty() => Some(&output.values),
            Self::Ai(output) if !output.results_for_sheets.is_empty() => {
                Some(&output.results_for_sheets)
            }
            _ => None,
        }
    }

    /// One-line summary used by the email report component.
    pub fn summary(&self) -> String {
        match self {
            Self::Trigger(t) => format!("triggered at {}", t.triggered_at),
            Self::Rows(r) => format!("read {} rows", r.values.len()),
            Self::Written(w) => match w.status {
                WriteStatus::Written => format!("wrote {} rows", w.rows_written),
                WriteStatus::Simulated => {
                    format!("simulated write of {} rows", w.rows_written)
                }
            },
            Self::Ai(a) => format!(
                "generated {} chars ({} row results)",
                a.response.len(),
                a.results.len()
            ),
            Self::File(f) => format!("uploaded {} ({} bytes)", f.name, f.size_bytes),
            Self::Email(e) => format!("emailed {} recipients", e.recipients.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tagged_serialization_shape() {
        let output = NodeOutput::Trigger(TriggerOutput {
            triggered_at: 1700000000000,
            payload: json!({"run": "manual"}),
        });

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["type"], "Trigger");
        assert_eq!(value["data"]["payload"]["run"], "manual");
    }

    #[test]
    fn records_projection_uses_first_row_as_header() {
        let output = RowsOutput::from_matrix(
            vec![
                vec![json!("name"), json!("score")],
                vec![json!("ada"), json!(91)],
                vec![json!("grace")],
            ],
            None,
        );

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0]["name"], json!("ada"));
        assert_eq!(output.records[0]["score"], json!(91));
        // Short row pads missing fields with null
        assert_eq!(output.records[1]["score"], Value::Null);
    }

    #[test]
    fn records_projection_empty_matrix() {
        let output = RowsOutput::from_matrix(vec![], None);
        assert!(output.values.is_empty());
        assert!(output.records.is_empty());
    }

    #[test]
    fn rows_for_write_only_from_tabular_variants() {
        let rows = NodeOutput::Rows(RowsOutput::from_matrix(
            vec![vec![json!("h")], vec![json!("x")]],
            None,
        ));
        assert_eq!(rows.rows_for_write().unwrap().len(), 2);

        let ai = NodeOutput::Ai(AiOutput {
            response: "done".to_string(),
            model: "test".to_string(),
            results: vec![],
            results_for_sheets: vec![vec![json!("header")], vec![json!("value")]],
        });
        assert_eq!(ai.rows_for_write().unwrap().len(), 2);

        let trigger = NodeOutput::Trigger(TriggerOutput {
            triggered_at: 0,
            payload: json!({"data": [[1, 2]]}),
        });
        assert!(trigger.rows_for_write().is_none());
    }
}
