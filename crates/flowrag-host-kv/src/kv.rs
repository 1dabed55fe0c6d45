use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::KvError;

pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, KvError>> + Send + 'a>>;

/// Trait for durable key-value storage.
///
/// This trait is async so that backends may live on disk or across the network.
pub trait KvStore: Send + Sync {
  /// Get a value by key.
  fn get(&self, key: &str) -> KvFuture<'_, Option<String>>;

  /// Set a value.
  fn set(&mut self, key: &str, value: String) -> KvFuture<'_, ()>;

  /// Delete a value. Deleting a missing key is not an error.
  fn delete(&mut self, key: &str) -> KvFuture<'_, ()>;
}

/// In-memory KV store implementation.
///
/// Nothing survives the process. Suitable for tests.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
  data: HashMap<String, String>,
}

impl InMemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for InMemoryKvStore {
  fn get(&self, key: &str) -> KvFuture<'_, Option<String>> {
    let value = self.data.get(key).cloned();
    Box::pin(async move { Ok(value) })
  }

  fn set(&mut self, key: &str, value: String) -> KvFuture<'_, ()> {
    self.data.insert(key.to_string(), value);
    Box::pin(async { Ok(()) })
  }

  fn delete(&mut self, key: &str) -> KvFuture<'_, ()> {
    self.data.remove(key);
    Box::pin(async { Ok(()) })
  }
}
