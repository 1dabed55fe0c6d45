//! Durable key-value storage for session state.
//!
//! The engine keeps exactly one entry here, the last session identifier the
//! remote service issued, so that a new process can continue a conversation.
//! [`InMemoryKvStore`] suits tests and embedded use; [`FileKvStore`] persists
//! a small JSON object on disk.

mod error;
mod file;
mod kv;

pub use error::KvError;
pub use file::FileKvStore;
pub use kv::{InMemoryKvStore, KvFuture, KvStore};
