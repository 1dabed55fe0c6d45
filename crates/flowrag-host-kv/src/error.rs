use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
  #[error("failed to access store file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("store file {path} is not a JSON object of strings: {source}")]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
