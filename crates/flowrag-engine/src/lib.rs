//! Flowrag Workflow Engine
//!
//! This crate runs a workflow document as a single request/response pipeline
//! against the remote question-answering service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - run() guarded by a drop-if-busy flag                     │
//! │  - resolve path → validate → build context → chat → patch   │
//! │  - session id: output node first, durable store second      │
//! └─────────────────────────────────────────────────────────────┘
//!            │                    │                    │
//!            ▼                    ▼                    ▼
//! ┌────────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │    GraphHandle     │ │ ExecutorRegistry │ │   ChatService    │
//! │  snapshot / patch  │ │ node type → exec │ │  remote answer   │
//! └────────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use flowrag_engine::{GraphHandle, WorkflowRunner};
//! use flowrag_host_http::{ClientConfig, HttpClient};
//! use flowrag_host_kv::FileKvStore;
//!
//! let graph = GraphHandle::new(workflow);
//! let client = HttpClient::new(ClientConfig::default())?;
//! let runner = Arc::new(WorkflowRunner::new(
//!     graph.clone(),
//!     Arc::new(client),
//!     Box::new(FileKvStore::new(data_dir.join("session.json"))),
//! ));
//!
//! // Whoever owns the "run" button keeps the runner.
//! runner.run().await;
//! let output = graph.first_output().await;
//! ```

mod context;
mod error;
mod events;
mod executor;
mod handle;
mod runner;

pub use context::ExecutionContext;
pub use error::{ExecutorError, RunError};
pub use events::{ChannelNotifier, NoopNotifier, RunEvent, RunNotifier, RunState};
pub use executor::{AugmentationExecutor, ExecutorRegistry, InputExecutor, NodeExecutor};
pub use handle::GraphHandle;
pub use runner::{EngineConfig, RunOutcome, RunSummary, SESSION_KEY, WorkflowRunner};
