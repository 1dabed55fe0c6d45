use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
///
/// Only `source` and `target` matter to the engine. Anything else the editing
/// surface stores on an edge (animation flags, handles) is kept verbatim in
/// `extra` so documents survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  #[serde(default)]
  pub id: String,
  pub source: String,
  pub target: String,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      extra: serde_json::Map::new(),
    }
  }
}
