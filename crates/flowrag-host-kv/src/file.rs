use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::KvError;
use crate::kv::{KvFuture, KvStore};

/// File-backed KV store.
///
/// All entries live in one JSON object at `path`. The file is read on every
/// `get` and rewritten on every change, so two processes sharing a data
/// directory see each other's latest session. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileKvStore {
  path: PathBuf,
}

impl FileKvStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  async fn load(&self) -> Result<BTreeMap<String, String>, KvError> {
    let content = match fs::read_to_string(&self.path).await {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
      Err(e) => {
        return Err(KvError::Io {
          path: self.path.clone(),
          source: e,
        });
      }
    };

    if content.trim().is_empty() {
      return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).map_err(|e| KvError::Corrupt {
      path: self.path.clone(),
      source: e,
    })
  }

  async fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), KvError> {
    let io_err = |e| KvError::Io {
      path: self.path.clone(),
      source: e,
    };

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(entries).map_err(|e| KvError::Corrupt {
      path: self.path.clone(),
      source: e,
    })?;

    // Write to a sibling and rename so a crash never leaves a half-written file.
    let tmp = self.path.with_extension("json.tmp");
    fs::write(&tmp, json).await.map_err(io_err)?;
    fs::rename(&tmp, &self.path).await.map_err(io_err)?;

    debug!(path = %self.path.display(), entries = entries.len(), "kv store saved");
    Ok(())
  }
}

impl KvStore for FileKvStore {
  fn get(&self, key: &str) -> KvFuture<'_, Option<String>> {
    let key = key.to_string();
    Box::pin(async move { Ok(self.load().await?.remove(&key)) })
  }

  fn set(&mut self, key: &str, value: String) -> KvFuture<'_, ()> {
    let key = key.to_string();
    Box::pin(async move {
      let mut entries = self.load().await?;
      entries.insert(key, value);
      self.save(&entries).await
    })
  }

  fn delete(&mut self, key: &str) -> KvFuture<'_, ()> {
    let key = key.to_string();
    Box::pin(async move {
      let mut entries = self.load().await?;
      if entries.remove(&key).is_some() {
        self.save(&entries).await?;
      }
      Ok(())
    })
  }
}
