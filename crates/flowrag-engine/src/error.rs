//! Error types for workflow runs.
//!
//! None of these escape [`WorkflowRunner::run`](crate::WorkflowRunner::run).
//! They are written into the output nodes' `error` field, so `Display` is the
//! user-facing message.

use flowrag_config::NodeKind;
use flowrag_host_http::ClientError;
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
  /// Missing input/output nodes or no connected route. Carries every problem
  /// message joined together.
  #[error("{0}")]
  Structural(String),

  /// A node executor failed while reading its node.
  #[error("Node execution failed ({node_type}): {source}")]
  NodeExecution {
    node_type: NodeKind,
    #[source]
    source: ExecutorError,
  },

  /// No input node on the path supplied a prompt.
  #[error("Please enter a prompt in an Input node")]
  EmptyPrompt,

  #[error("Prompt too long (>{max} chars)")]
  PromptTooLong { max: usize, actual: usize },

  /// Network failure, non-success status or malformed payload.
  #[error(transparent)]
  Remote(#[from] ClientError),
}

/// Errors raised by a [`NodeExecutor`](crate::NodeExecutor).
#[derive(Debug, Error)]
pub enum ExecutorError {
  #[error("node '{node_id}' is a {actual} node, expected {expected}")]
  UnexpectedNode {
    node_id: String,
    expected: NodeKind,
    actual: NodeKind,
  },

  #[error("{0}")]
  Failed(String),
}

impl ExecutorError {
  pub fn failed(message: impl Into<String>) -> Self {
    ExecutorError::Failed(message.into())
  }
}
