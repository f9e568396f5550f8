//! The `Transport` trait: the seam between the pipeline and the network.
//!
//! The core only builds request bodies and interprets responses. Whatever
//! actually moves bytes (`edo-client`'s `reqwest` transport in production, a
//! scripted fake in tests) implements this trait.

use std::future::Future;

use serde_json::Value;

use crate::{Result, session::SessionToken};

/// Status and undecoded body of a remote response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body:   String,
}

impl RawResponse {
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    Self { status, body: body.into() }
  }

  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Performs one JSON POST exchange with the remote service.
///
/// Implementations own timeouts and connection handling. They must return
/// `Ok` for any response that arrived, whatever its status; `Err` is reserved
/// for exchanges that could not complete (`Error::Transport`).
pub trait Transport: Send + Sync {
  /// POST `body` as JSON to `url`. When `session` is present it is sent in
  /// the [`SESSION_HEADER`](crate::wire::SESSION_HEADER) header.
  fn post_json(
    &self,
    url: &str,
    session: Option<&SessionToken>,
    body: &Value,
  ) -> impl Future<Output = Result<RawResponse>> + Send;
}
