use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub node_type: NodeType,
    /// Static configuration saved with the workflow definition. May contain
    /// `{{...}}` templates resolved against upstream outputs at run time.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn is_trigger(&self) -> bool {
        matches!(self.node_type, NodeType::ManualTrigger)
    }
}

/// Canvas coordinates saved by the graph editor. The engine ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    ManualTrigger,
    SheetRead,
    SheetWrite,
    AiGenerate,
    FileWrite,
    EmailReport,
}

impl NodeType {
    /// Stable type-name key used by the component catalog and persisted on
    /// execution steps.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::ManualTrigger => "manual_trigger",
            NodeType::SheetRead => "sheet_read",
            NodeType::SheetWrite => "sheet_write",
            NodeType::AiGenerate => "ai_generate",
            NodeType::FileWrite => "file_write",
            NodeType::EmailReport => "email_report",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}
