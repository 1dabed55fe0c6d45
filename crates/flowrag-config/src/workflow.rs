use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::node::{NodeDef, NodeKind};

/// A workflow document: ordered nodes and ordered edges.
///
/// Order is significant. The path resolver walks input nodes and edges in the
/// order they appear here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

impl WorkflowDef {
  pub fn new(nodes: Vec<NodeDef>, edges: Vec<Edge>) -> Self {
    Self {
      name: None,
      nodes,
      edges,
    }
  }

  pub fn node(&self, id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.id == id)
  }

  pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeDef> {
    self.nodes.iter_mut().find(|n| n.id == id)
  }

  /// Iterate over nodes of the given kind, in document order.
  pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &NodeDef> {
    self.nodes.iter().filter(move |n| n.kind() == kind)
  }
}
