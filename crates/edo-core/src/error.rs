//! Error types for `edo-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing or malformed input, detected before any remote call.
  #[error("{0}")]
  Validation(String),

  /// The remote service answered with a non-success status or an error
  /// payload.
  #[error("upstream error ({status}): {message}")]
  Upstream { status: u16, message: String },

  /// A response that should have carried structured data did not.
  #[error("malformed upstream response: {raw}")]
  MalformedResponse { raw: String },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn is_validation(&self) -> bool { matches!(self, Self::Validation(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
