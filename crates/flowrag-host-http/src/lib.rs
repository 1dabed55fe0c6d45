//! Client for the remote question-answering service.
//!
//! The engine only needs [`ChatService`]; [`HttpClient`] implements it over
//! HTTP and additionally offers the document upload and health endpoints the
//! command line uses.
//!
//! Response bodies are read leniently: several field-name spellings are in use
//! across service versions, and the first one present wins.

mod client;
mod config;
mod error;
mod reply;
mod types;

pub use client::{ChatService, HttpClient, MAX_UPLOAD_BYTES};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, Operation};
pub use types::{ChatReply, ChatRequest, HealthState, HealthStatus, UploadReply};
