use std::time::Duration;

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000/api";

/// Configuration for [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Base URL every endpoint path is appended to.
  pub base_url: Url,
  /// Timeout for chat and upload requests.
  pub timeout: Duration,
  /// Timeout for the health probe.
  pub health_timeout: Duration,
  /// Latency above which a healthy response is reported as degraded.
  pub degraded_latency: Duration,
}

impl ClientConfig {
  pub fn new(base_url: &str) -> Result<Self, ClientError> {
    Ok(Self {
      base_url: Url::parse(base_url)?,
      ..Self::default()
    })
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Full URL of an endpoint, e.g. `endpoint("chat")`.
  pub fn endpoint(&self, path: &str) -> String {
    format!(
      "{}/{}",
      self.base_url.as_str().trim_end_matches('/'),
      path.trim_start_matches('/')
    )
  }
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
      timeout: Duration::from_secs(60),
      health_timeout: Duration::from_secs(5),
      degraded_latency: Duration::from_millis(1500),
    }
  }
}
