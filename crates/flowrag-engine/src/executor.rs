//! Node executors.
//!
//! An executor inspects one node on the execution path and enriches the
//! [`ExecutionContext`]. Lookup is by node type; output nodes and unknown node
//! types have no executor and are passed over.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use flowrag_config::{NodeDef, NodeKind, NodeType};

use crate::context::ExecutionContext;
use crate::error::ExecutorError;

#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute(&self, node: &NodeDef, ctx: &mut ExecutionContext) -> Result<(), ExecutorError>;
}

/// Supplies the prompt. The first non-blank prompt on the path wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputExecutor;

#[async_trait]
impl NodeExecutor for InputExecutor {
  async fn execute(&self, node: &NodeDef, ctx: &mut ExecutionContext) -> Result<(), ExecutorError> {
    let NodeType::Input { data } = &node.node_type else {
      return Err(unexpected(node, NodeKind::Input));
    };

    let text = data.text();
    if !text.trim().is_empty() {
      ctx.set_prompt_if_unset(text);
    }
    Ok(())
  }
}

/// Supplies the document reference. The last augmentation node on the path
/// with a document wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentationExecutor;

#[async_trait]
impl NodeExecutor for AugmentationExecutor {
  async fn execute(&self, node: &NodeDef, ctx: &mut ExecutionContext) -> Result<(), ExecutorError> {
    let NodeType::Augmentation { data } = &node.node_type else {
      return Err(unexpected(node, NodeKind::Augmentation));
    };

    if let Some(document_id) = data.document_id.as_deref().filter(|id| !id.is_empty()) {
      ctx.set_document_id(document_id);
    }
    Ok(())
  }
}

fn unexpected(node: &NodeDef, expected: NodeKind) -> ExecutorError {
  ExecutorError::UnexpectedNode {
    node_id: node.id.clone(),
    expected,
    actual: node.kind(),
  }
}

/// Maps node types to executors.
#[derive(Clone)]
pub struct ExecutorRegistry {
  executors: HashMap<NodeKind, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  /// A registry with no executors at all.
  pub fn empty() -> Self {
    Self {
      executors: HashMap::new(),
    }
  }

  /// Register an executor for a node type, returning the one it replaces.
  pub fn register(
    &mut self,
    kind: NodeKind,
    executor: impl NodeExecutor + 'static,
  ) -> Option<Arc<dyn NodeExecutor>> {
    self.executors.insert(kind, Arc::new(executor))
  }

  /// Look up the executor for a node type. Always `None` for unknown types.
  pub fn get(&self, kind: NodeKind) -> Option<&dyn NodeExecutor> {
    if kind == NodeKind::Unknown {
      return None;
    }
    self.executors.get(&kind).map(|e| e.as_ref())
  }
}

impl Default for ExecutorRegistry {
  fn default() -> Self {
    let mut registry = Self::empty();
    registry.register(NodeKind::Input, InputExecutor);
    registry.register(NodeKind::Augmentation, AugmentationExecutor);
    registry
  }
}

impl fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut kinds: Vec<&str> = self.executors.keys().map(|k| k.as_str()).collect();
    kinds.sort_unstable();
    f.debug_struct("ExecutorRegistry")
      .field("kinds", &kinds)
      .finish()
  }
}
