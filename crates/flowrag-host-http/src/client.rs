use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, header};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Operation};
use crate::reply::{parse_chat, parse_upload};
use crate::types::{ChatReply, ChatRequest, HealthState, HealthStatus, UploadReply};

/// Largest document accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The remote chat capability the engine depends on.
#[async_trait]
pub trait ChatService: Send + Sync {
  /// Send one prompt and return the service's answer.
  async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError>;
}

/// HTTP implementation of the service client.
#[derive(Debug, Clone)]
pub struct HttpClient {
  client: Client,
  config: ClientConfig,
}

impl HttpClient {
  pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  /// Upload a PDF document for retrieval.
  ///
  /// The file must have a `.pdf` extension and be at most 10 MiB; both are
  /// checked before anything is sent. The type check is by extension only,
  /// the file contents are not inspected. The part is always sent as
  /// `application/pdf`.
  #[instrument(skip(self, path), fields(path = %path.display()))]
  pub async fn upload_pdf(&self, path: &Path) -> Result<UploadReply, ClientError> {
    let is_pdf = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
      return Err(ClientError::NotPdf {
        path: path.to_path_buf(),
      });
    }

    let io_err = |e| ClientError::Io {
      path: path.to_path_buf(),
      source: e,
    };
    let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
    if size > MAX_UPLOAD_BYTES {
      return Err(ClientError::FileTooLarge {
        path: path.to_path_buf(),
        size,
      });
    }
    let bytes = tokio::fs::read(path).await.map_err(io_err)?;

    let file_name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "document.pdf".to_string());
    let part = Part::bytes(bytes)
      .file_name(file_name)
      .mime_str("application/pdf")?;
    let form = Form::new().part("file", part);

    let response = self
      .client
      .post(self.config.endpoint("upload-pdf"))
      .multipart(form)
      .send()
      .await?;
    let body = success_body(Operation::Upload, response).await?;
    let reply = parse_upload(&body)?;

    info!(document_id = %reply.document_id, chunks = ?reply.chunk_count, "document uploaded");
    Ok(reply)
  }

  /// Probe the service once.
  ///
  /// Never fails: transport problems are reported as [`HealthState::Down`].
  pub async fn health(&self) -> HealthStatus {
    let start = Instant::now();
    let result = self
      .client
      .get(self.config.endpoint("health"))
      .header(header::ACCEPT, "application/json")
      .timeout(self.config.health_timeout)
      .send()
      .await;

    let response = match result {
      Ok(response) => response,
      Err(e) => {
        let error = if e.is_timeout() {
          "Timeout".to_string()
        } else {
          e.to_string()
        };
        return HealthStatus {
          state: HealthState::Down,
          latency_ms: None,
          error: Some(error),
        };
      }
    };

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();
    if !status.is_success() {
      return HealthStatus {
        state: HealthState::Down,
        latency_ms: Some(latency_ms),
        error: Some(format!("HTTP {}", status.as_u16())),
      };
    }

    let state = if latency_ms > self.config.degraded_latency.as_millis() as u64 {
      HealthState::Degraded
    } else {
      HealthState::Up
    };

    #[derive(Deserialize)]
    struct HealthBody {
      message: Option<String>,
    }
    let message = match state {
      HealthState::Up => None,
      _ => response
        .json::<HealthBody>()
        .await
        .ok()
        .and_then(|body| body.message),
    };

    HealthStatus {
      state,
      latency_ms: Some(latency_ms),
      error: message,
    }
  }

  async fn post_chat(&self, path: &str, request: &ChatRequest) -> Result<Response, ClientError> {
    let response = self
      .client
      .post(self.config.endpoint(path))
      .json(request)
      .send()
      .await?;
    Ok(response)
  }
}

#[async_trait]
impl ChatService for HttpClient {
  #[instrument(
    skip(self, request),
    fields(session_id = ?request.session_id, document_id = ?request.document_id)
  )]
  async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ClientError> {
    let mut response = self.post_chat("chat", request).await?;

    if matches!(
      response.status(),
      StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
    ) {
      warn!(status = %response.status(), "chat endpoint unavailable, falling back to legacy query endpoint");
      response = self.post_chat("query", request).await?;
    }

    let body = success_body(Operation::Chat, response).await?;
    let reply = parse_chat(&body)?;

    debug!(
      session_id = %reply.session_id,
      retrieved = ?reply.retrieved_count,
      "chat answered"
    );
    Ok(reply)
  }
}

async fn success_body(operation: Operation, response: Response) -> Result<String, ClientError> {
  let status = response.status();
  if !status.is_success() {
    return Err(ClientError::Status { operation, status });
  }
  Ok(response.text().await?)
}
