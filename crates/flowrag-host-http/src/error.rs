use std::fmt;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// The remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Chat,
  Upload,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::Chat => f.write_str("Chat"),
      Operation::Upload => f.write_str("Upload"),
    }
  }
}

/// Errors raised by the service client.
///
/// The `Display` text is what ends up on the output node, so the messages are
/// phrased for the person running the workflow.
#[derive(Debug, Error)]
pub enum ClientError {
  #[error("Please select a PDF file")]
  NotPdf { path: PathBuf },

  #[error("File size must be less than 10MB")]
  FileTooLarge { path: PathBuf, size: u64 },

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{0}")]
  Request(#[from] reqwest::Error),

  #[error("{operation} failed: {status}")]
  Status {
    operation: Operation,
    status: StatusCode,
  },

  #[error("{operation} failed: malformed response ({message})")]
  MalformedResponse {
    operation: Operation,
    message: String,
  },

  #[error("invalid base URL: {0}")]
  InvalidBaseUrl(#[from] url::ParseError),
}

impl ClientError {
  pub(crate) fn malformed(operation: Operation, message: impl Into<String>) -> Self {
    ClientError::MalformedResponse {
      operation,
      message: message.into(),
    }
  }
}
