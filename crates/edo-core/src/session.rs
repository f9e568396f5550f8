//! Session acquisition against the remote auth endpoint.
//!
//! [`authenticate`] performs one login call. [`Authenticator`] memoises the
//! resulting token for its own lifetime and makes concurrent callers share a
//! single in-flight login.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{
  EdoEndpoints, Error, Result,
  transport::Transport,
  wire,
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Opaque session identifier issued by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
  pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Login and password for the remote service.
#[derive(Clone, Deserialize)]
pub struct Credentials {
  pub login:    String,
  pub password: String,
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("login", &self.login)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Result of a call that is allowed to fail without failing its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
  Available(T),
  Unavailable { reason: String },
}

impl<T> Availability<T> {
  pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }

  pub fn into_option(self) -> Option<T> {
    match self {
      Self::Available(v) => Some(v),
      Self::Unavailable { .. } => None,
    }
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// Fields that may carry the session id in a successful login response,
/// checked in order.
const TOKEN_FIELDS: [&str; 2] = ["result", "sid"];

/// Exchange `credentials` for a session token with one remote call.
pub async fn authenticate<T>(
  transport: &T,
  endpoints: &EdoEndpoints,
  credentials: &Credentials,
) -> Result<SessionToken>
where
  T: Transport,
{
  let body = wire::auth_envelope(&credentials.login, &credentials.password)?;
  let response = transport.post_json(&endpoints.auth, None, &body).await?;
  let parsed = wire::parse_rpc(&response)?;

  let token = parsed.as_ref().and_then(|v| {
    TOKEN_FIELDS
      .iter()
      .find_map(|k| v.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
  });

  match token {
    Some(token) => {
      info!(login = %credentials.login, "authenticated");
      Ok(SessionToken::new(token))
    }
    None => Err(Error::MalformedResponse { raw: response.body }),
  }
}

/// Fetch the caller's own organizations. Best effort: any failure is reported
/// as [`Availability::Unavailable`].
pub async fn list_own_organizations<T>(
  transport: &T,
  endpoints: &EdoEndpoints,
  session: &SessionToken,
) -> Availability<Value>
where
  T: Transport,
{
  match fetch_own_organizations(transport, endpoints, session).await {
    Ok(list) => Availability::Available(list),
    Err(e) => {
      warn!(error = %e, "own organization listing unavailable");
      Availability::Unavailable { reason: e.to_string() }
    }
  }
}

async fn fetch_own_organizations<T>(
  transport: &T,
  endpoints: &EdoEndpoints,
  session: &SessionToken,
) -> Result<Value>
where
  T: Transport,
{
  let body = wire::list_own_organizations_envelope()?;
  let response = transport
    .post_json(&endpoints.service, Some(session), &body)
    .await?;
  match wire::parse_rpc(&response)? {
    Some(mut v) => Ok(v.get_mut("result").map(Value::take).unwrap_or(Value::Null)),
    None => Err(Error::MalformedResponse { raw: response.body }),
  }
}

// ─── Memoised session ────────────────────────────────────────────────────────

/// Lazily authenticates once and hands the same token to every caller.
///
/// Concurrent calls to [`session`](Self::session) wait on the single
/// in-flight login. A failed login leaves nothing cached; the next call
/// tries again.
pub struct Authenticator<T> {
  transport:   Arc<T>,
  endpoints:   EdoEndpoints,
  credentials: Credentials,
  token:       OnceCell<SessionToken>,
}

impl<T: Transport> Authenticator<T> {
  pub fn new(
    transport: Arc<T>,
    endpoints: EdoEndpoints,
    credentials: Credentials,
  ) -> Self {
    Self {
      transport,
      endpoints,
      credentials,
      token: OnceCell::new(),
    }
  }

  pub async fn session(&self) -> Result<SessionToken> {
    self
      .token
      .get_or_try_init(|| {
        authenticate(self.transport.as_ref(), &self.endpoints, &self.credentials)
      })
      .await
      .cloned()
  }

  /// The token, if a login has already succeeded.
  pub fn cached(&self) -> Option<&SessionToken> { self.token.get() }

  /// Own organizations for the current session; logs in first if needed.
  pub async fn own_organizations(&self) -> Result<Availability<Value>> {
    let session = self.session().await?;
    Ok(
      list_own_organizations(self.transport.as_ref(), &self.endpoints, &session)
        .await,
    )
  }
}
