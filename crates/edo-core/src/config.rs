//! Remote service configuration and the endpoints derived from it.

use serde::Deserialize;

/// Document type tag used when the caller does not supply one
/// ("outgoing contract").
pub const DEFAULT_DOCUMENT_TYPE: &str = "ДоговорИсх";

fn default_document_type() -> String { DEFAULT_DOCUMENT_TYPE.to_string() }

/// Settings for talking to one EDO installation.
#[derive(Debug, Clone, Deserialize)]
pub struct EdoConfig {
  /// Service root, e.g. `https://online.sbis.ru`.
  pub base_url:              String,
  #[serde(default = "default_document_type")]
  pub default_document_type: String,
}

impl EdoConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url:              base_url.into(),
      default_document_type: default_document_type(),
    }
  }

  pub fn endpoints(&self) -> EdoEndpoints { EdoEndpoints::from_base(&self.base_url) }
}

/// Absolute URLs of the two remote entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdoEndpoints {
  /// Receives the authentication call only.
  pub auth:    String,
  /// Receives every call that carries a session header.
  pub service: String,
}

impl EdoEndpoints {
  pub fn from_base(base_url: &str) -> Self {
    let base = base_url.trim_end_matches('/');
    Self {
      auth:    format!("{base}/auth/service/"),
      service: format!("{base}/service/?srv=1"),
    }
  }
}
