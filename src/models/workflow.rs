use super::node::{Edge, Node};
use serde::{Deserialize, Serialize};

/// A saved workflow definition: typed nodes plus directed edges.
///
/// Instances copy this snapshot at creation time, so edits to a definition
/// never affect runs already created from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Workflow {
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn trigger_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.is_trigger()).collect()
    }

    pub fn has_trigger_node(&self) -> bool {
        self.nodes.iter().any(|n| n.is_trigger())
    }
}
