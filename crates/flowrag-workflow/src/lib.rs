//! Flowrag Workflow
//!
//! This crate provides the run-time view of a workflow document.
//!
//! Key differences from `flowrag-config`:
//! - A [`GraphSnapshot`] is an immutable copy taken when a run starts, so
//!   edits made while the run is awaiting the remote service cannot tear it
//! - The [`Graph`] adjacency keeps edges in document order, which makes path
//!   resolution a pure function of the snapshot
//! - An [`ExecutionPath`] is the ordered node sequence selected for one run

mod error;
mod graph;
mod path;
mod snapshot;

pub use error::WorkflowError;
pub use graph::Graph;
pub use path::ExecutionPath;
pub use snapshot::{GraphSnapshot, check_document};
