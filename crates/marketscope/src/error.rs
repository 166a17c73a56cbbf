use thiserror::Error;

/// Failures talking to the research backend
#[derive(Error, Debug)]
pub enum ClientError {
  #[error("Request to {url} failed: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("Request to {url} timed out after {secs}s")]
  Timeout { url: String, secs: u64 },

  #[error("{url} returned {status}: {body}")]
  Status { url: String, status: u16, body: String },

  #[error("Could not decode response from {url}: {message}")]
  Decode { url: String, message: String },

  #[error("Analysis {id} is inconsistent: {message}")]
  InconsistentRecord { id: String, message: String },

  #[error("Invalid backend URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("Live channel failed: {message}")]
  Channel { message: String },
}

impl ClientError {
  pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
    Self::Http { url: url.into(), source }
  }

  pub fn timeout(url: impl Into<String>, secs: u64) -> Self {
    Self::Timeout { url: url.into(), secs }
  }

  pub fn status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
    Self::Status { url: url.into(), status, body: body.into() }
  }

  pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Decode { url: url.into(), message: message.into() }
  }

  pub fn inconsistent_record(id: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InconsistentRecord { id: id.into(), message: message.into() }
  }

  pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidUrl { url: url.into(), message: message.into() }
  }

  pub fn channel(message: impl Into<String>) -> Self {
    Self::Channel { message: message.into() }
  }

  /// HTTP status carried by the error, if the server answered at all
  pub fn status_code(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}
