use serde::Serialize;
use serde_json::{Map, Value};

/// Accumulator threaded through the node executors of one run.
///
/// Created empty at the start of a run and dropped when the run ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
  prompt: Option<String>,
  document_id: Option<String>,
  /// Free-form values for custom executors.
  extensions: Map<String, Value>,
}

impl ExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn prompt(&self) -> Option<&str> {
    self.prompt.as_deref()
  }

  /// Set the prompt unless one is already set. Returns whether it was set.
  pub fn set_prompt_if_unset(&mut self, prompt: impl Into<String>) -> bool {
    if self.prompt.is_some() {
      return false;
    }
    self.prompt = Some(prompt.into());
    true
  }

  pub fn document_id(&self) -> Option<&str> {
    self.document_id.as_deref()
  }

  /// Set the document reference, replacing any earlier one.
  pub fn set_document_id(&mut self, document_id: impl Into<String>) {
    self.document_id = Some(document_id.into());
  }

  pub fn extension(&self, key: &str) -> Option<&Value> {
    self.extensions.get(key)
  }

  pub fn set_extension(&mut self, key: impl Into<String>, value: Value) {
    self.extensions.insert(key.into(), value);
  }
}
