use serde::{Deserialize, Serialize};

/// The ordered node ids selected for one run.
///
/// When non-empty, the first id is an input node and the last an output node,
/// consecutive ids are joined by an edge, and no id repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionPath(Vec<String>);

impl ExecutionPath {
  pub fn new(ids: Vec<String>) -> Self {
    Self(ids)
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn ids(&self) -> &[String] {
    &self.0
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.0.iter().any(|id| id == node_id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }
}

impl std::fmt::Display for ExecutionPath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0.join(" -> "))
  }
}
