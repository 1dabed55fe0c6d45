use std::sync::Arc;

use flowrag_config::{NodeKind, NodeType, OutputData, WorkflowDef};
use flowrag_workflow::{GraphSnapshot, WorkflowError};
use tokio::sync::RwLock;

/// Shared handle on the live workflow document.
///
/// The editing surface and the runner both hold a clone. Reads take a
/// snapshot; the runner only ever writes to output nodes.
#[derive(Debug, Clone, Default)]
pub struct GraphHandle {
  inner: Arc<RwLock<WorkflowDef>>,
}

impl GraphHandle {
  pub fn new(workflow: WorkflowDef) -> Self {
    Self {
      inner: Arc::new(RwLock::new(workflow)),
    }
  }

  /// Copy the current nodes and edges. Later edits do not affect the copy.
  pub async fn snapshot(&self) -> GraphSnapshot {
    GraphSnapshot::capture(&*self.inner.read().await)
  }

  /// Clone of the whole document, output data included.
  pub async fn document(&self) -> WorkflowDef {
    self.inner.read().await.clone()
  }

  /// Set the prompt text of an input node. The label is kept in step so
  /// documents that only carry a label read the same text.
  pub async fn set_prompt(&self, node_id: &str, prompt: &str) -> Result<(), WorkflowError> {
    let mut workflow = self.inner.write().await;
    let node = workflow
      .node_mut(node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;

    match &mut node.node_type {
      NodeType::Input { data } => {
        data.prompt = Some(prompt.to_string());
        data.label = Some(prompt.to_string());
        Ok(())
      }
      other => Err(WorkflowError::UnexpectedNodeType {
        node_id: node_id.to_string(),
        expected: NodeKind::Input,
        actual: other.kind(),
      }),
    }
  }

  /// Record an uploaded document on an augmentation node.
  pub async fn attach_document(
    &self,
    node_id: &str,
    document_id: &str,
    file_name: Option<&str>,
  ) -> Result<(), WorkflowError> {
    let mut workflow = self.inner.write().await;
    let node = workflow
      .node_mut(node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;

    match &mut node.node_type {
      NodeType::Augmentation { data } => {
        data.document_id = Some(document_id.to_string());
        if let Some(file_name) = file_name {
          data.uploaded_file = Some(file_name.to_string());
        }
        Ok(())
      }
      other => Err(WorkflowError::UnexpectedNodeType {
        node_id: node_id.to_string(),
        expected: NodeKind::Augmentation,
        actual: other.kind(),
      }),
    }
  }

  /// Current data of the first output node in document order.
  pub async fn first_output(&self) -> Option<OutputData> {
    self
      .inner
      .read()
      .await
      .nodes
      .iter()
      .find_map(|n| n.output_data())
      .cloned()
  }

  /// Patch every output node present right now. Returns how many were patched.
  pub(crate) async fn patch_outputs(&self, mut patch: impl FnMut(&mut OutputData)) -> usize {
    let mut workflow = self.inner.write().await;
    let mut patched = 0;
    for data in workflow.nodes.iter_mut().filter_map(|n| n.output_data_mut()) {
      patch(data);
      patched += 1;
    }
    patched
  }
}
