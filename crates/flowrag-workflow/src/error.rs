use flowrag_config::NodeKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("edge references unknown node: source={source_id}, target={target_id}")]
  InvalidEdge {
    source_id: String,
    target_id: String,
  },

  #[error("node '{node_id}' is a {actual} node, expected {expected}")]
  UnexpectedNodeType {
    node_id: String,
    expected: NodeKind,
    actual: NodeKind,
  },
}
