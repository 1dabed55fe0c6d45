use std::collections::HashMap;

use flowrag_config::{Edge, NodeDef};

/// Graph structure for traversal.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> downstream node_ids, in edge order.
  adjacency: HashMap<String, Vec<String>>,
}

impl Graph {
  /// Build a graph from nodes and edges.
  ///
  /// Edges whose endpoints are not among `nodes` are dropped. Parallel edges
  /// are kept; traversal deduplicates through its visited set.
  pub fn new(nodes: &[NodeDef], edges: &[Edge]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in nodes {
      adjacency.entry(node.id.clone()).or_default();
    }

    for edge in edges {
      if !adjacency.contains_key(&edge.target) {
        continue;
      }
      if let Some(targets) = adjacency.get_mut(&edge.source) {
        targets.push(edge.target.clone());
      }
    }

    Self { adjacency }
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }
}
