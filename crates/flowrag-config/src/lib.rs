//! Flowrag Config
//!
//! This crate contains the serializable workflow document types for flowrag.
//! A workflow document is the editing surface's view of the graph: an ordered
//! list of typed nodes and an ordered list of directed edges.
//!
//! Documents are loaded from JSON files (via the CLI) or built in memory by an
//! embedding application. The engine snapshots them at run time and only ever
//! writes back into the `data` payload of output nodes.

mod chat;
mod edge;
mod node;
mod workflow;

pub use chat::{ChatTurn, Role};
pub use edge::Edge;
pub use node::{AugmentationData, InputData, NodeDef, NodeKind, NodeType, OutputData};
pub use workflow::WorkflowDef;
