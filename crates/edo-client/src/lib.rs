//! `reqwest`-backed [`Transport`] for the remote EDO service.

use std::time::Duration;

use edo_core::{
  Error, Result,
  session::SessionToken,
  transport::{RawResponse, Transport},
  wire::SESSION_HEADER,
};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP transport for JSON-RPC calls.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> { Self::with_timeout(DEFAULT_TIMEOUT) }

  pub fn with_timeout(timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  async fn post_json(
    &self,
    url: &str,
    session: Option<&SessionToken>,
    body: &Value,
  ) -> Result<RawResponse> {
    let mut request = self.client.post(url).json(body);
    if let Some(session) = session {
      request = request.header(SESSION_HEADER, session.as_str());
    }

    let response = request
      .send()
      .await
      .map_err(|e| Error::Transport(format!("POST {url} failed: {e}")))?;

    let status = response.status().as_u16();
    let body = response
      .text()
      .await
      .map_err(|e| Error::Transport(format!("reading response from {url}: {e}")))?;

    debug!(%url, status, "remote call finished");
    Ok(RawResponse { status, body })
  }
}
