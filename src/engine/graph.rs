use crate::error::EngineError;
use crate::models::{Node, Workflow};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::warn;

/// Adjacency view over a workflow definition.
///
/// Declaration order of the nodes is retained so that topological ordering is
/// deterministic: nodes with no relative edge constraint always come out in
/// the order they were declared.
pub struct WorkflowGraph {
    nodes: HashMap<String, Node>,
    /// Node ids in declaration order; doubles as the tie-break key.
    order: Vec<String>,
    adjacency: HashMap<String, Vec<String>>,
    in_degree: HashMap<String, usize>,
}

impl WorkflowGraph {
    pub fn new(workflow: &Workflow) -> Result<Self, EngineError> {
        let mut nodes = HashMap::new();
        let mut order = Vec::with_capacity(workflow.nodes.len());
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        let mut in_degree: HashMap<String, usize> = HashMap::new();

        for node in &workflow.nodes {
            if nodes.insert(node.id.clone(), node.clone()).is_some() {
                return Err(EngineError::Validation(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
            order.push(node.id.clone());
            adjacency.insert(node.id.clone(), Vec::new());
            in_degree.insert(node.id.clone(), 0);
        }

        for edge in &workflow.edges {
            if !nodes.contains_key(&edge.from) {
                return Err(EngineError::Validation(format!(
                    "edge references unknown source node: {}",
                    edge.from
                )));
            }
            let degree = in_degree.get_mut(&edge.to).ok_or_else(|| {
                EngineError::Validation(format!(
                    "edge references unknown target node: {}",
                    edge.to
                ))
            })?;
            *degree += 1;
            adjacency
                .get_mut(&edge.from)
                .expect("source checked above")
                .push(edge.to.clone());
        }

        Ok(Self {
            nodes,
            order,
            adjacency,
            in_degree,
        })
    }

    /// Validate the graph before any node executes: non-empty, at least one
    /// entry point, acyclic. Entry points are expected to be trigger nodes;
    /// a non-trigger entry is tolerated but logged.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.nodes.is_empty() {
            return Err(EngineError::Validation(
                "workflow has no nodes".to_string(),
            ));
        }

        let entries = self.entry_points();
        if entries.is_empty() {
            return Err(EngineError::NoEntryPoint);
        }

        for entry in &entries {
            if let Some(node) = self.nodes.get(entry)
                && !node.is_trigger()
            {
                warn!(node_id = %entry, node_type = %node.node_type, "Entry point is not a trigger node");
            }
        }

        // Cycle detection is a dry run of the topological sort.
        self.topological_order().map(|_| ())
    }

    /// Kahn's algorithm. The ready set is a min-heap keyed by declaration
    /// index, so repeated calls on the same graph yield the same sequence.
    pub fn topological_order(&self) -> Result<Vec<String>, EngineError> {
        let index_of: HashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut in_degree = self.in_degree.clone();
        let mut ready: BinaryHeap<Reverse<(usize, String)>> = self
            .order
            .iter()
            .filter(|id| in_degree[id.as_str()] == 0)
            .map(|id| Reverse((index_of[id.as_str()], id.clone())))
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());

        while let Some(Reverse((_, node_id))) = ready.pop() {
            if let Some(neighbors) = self.adjacency.get(&node_id) {
                for neighbor in neighbors {
                    let degree = in_degree
                        .get_mut(neighbor)
                        .expect("edges validated at construction");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((index_of[neighbor.as_str()], neighbor.clone())));
                    }
                }
            }
            result.push(node_id);
        }

        if result.len() != self.nodes.len() {
            return Err(EngineError::CyclicGraph);
        }

        Ok(result)
    }

    /// Nodes with no incoming edges, in declaration order.
    pub fn entry_points(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.in_degree[id.as_str()] == 0)
            .cloned()
            .collect()
    }

    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn dependencies(&self, node_id: &str) -> Vec<String> {
        self.adjacency
            .iter()
            .filter(|(_, targets)| targets.iter().any(|t| t == node_id))
            .map(|(source, _)| source.clone())
            .collect()
    }

    pub fn downstream(&self, node_id: &str) -> Vec<String> {
        self.adjacency.get(node_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
