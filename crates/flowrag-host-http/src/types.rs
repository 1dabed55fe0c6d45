use serde::Serialize;

/// Body of a chat request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
  pub prompt: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub document_id: Option<String>,
}

/// A successful chat answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
  pub answer: String,
  pub session_id: String,
  /// Number of passages the service retrieved, when it reports one.
  pub retrieved_count: Option<u64>,
}

/// Result of a document upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReply {
  pub document_id: String,
  pub chunk_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
  Up,
  Degraded,
  Down,
}

/// Outcome of one health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
  pub state: HealthState,
  pub latency_ms: Option<u64>,
  pub error: Option<String>,
}
