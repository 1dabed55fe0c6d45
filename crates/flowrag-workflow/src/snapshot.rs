use std::collections::HashSet;

use flowrag_config::{Edge, NodeDef, NodeKind, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// An immutable copy of the workflow graph, taken when a run starts.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
  nodes: Vec<NodeDef>,
  edges: Vec<Edge>,
}

impl GraphSnapshot {
  pub fn new(nodes: Vec<NodeDef>, edges: Vec<Edge>) -> Self {
    Self { nodes, edges }
  }

  /// Copy the nodes and edges of a document.
  pub fn capture(def: &WorkflowDef) -> Self {
    Self::new(def.nodes.clone(), def.edges.clone())
  }

  pub fn nodes(&self) -> &[NodeDef] {
    &self.nodes
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  /// Get a node by ID.
  pub fn node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  /// Nodes of the given kind, in snapshot order.
  pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &NodeDef> {
    self.nodes.iter().filter(move |n| n.kind() == kind)
  }

  pub fn count(&self, kind: NodeKind) -> usize {
    self.nodes_of(kind).count()
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }
}

/// Check a document for problems that make it unusable as a graph at all:
/// repeated node ids and edges pointing at nodes that do not exist.
///
/// The engine itself tolerates dangling edges (it ignores them), so this is
/// meant for loaders that want to reject broken files up front.
pub fn check_document(def: &WorkflowDef) -> Result<(), WorkflowError> {
  let mut seen = HashSet::new();
  for node in &def.nodes {
    if !seen.insert(node.id.as_str()) {
      return Err(WorkflowError::DuplicateNode(node.id.clone()));
    }
  }

  for edge in &def.edges {
    if !seen.contains(edge.source.as_str()) || !seen.contains(edge.target.as_str()) {
      return Err(WorkflowError::InvalidEdge {
        source_id: edge.source.clone(),
        target_id: edge.target.clone(),
      });
    }
  }

  Ok(())
}
