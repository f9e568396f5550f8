//! Handler for `POST /auth`.
//!
//! Body: `{"login":"…","password":"…"}`. Responds with the session id and,
//! when the remote service lists them, the caller's own organizations.

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use edo_core::{
  session::{self, Credentials, SessionToken},
  submit::Submitter,
  transport::Transport,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
  pub session_id:    SessionToken,
  /// Omitted when the listing call failed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub organizations: Option<Value>,
}

/// `POST /auth`
pub async fn handler<T>(
  State(submitter): State<Arc<Submitter<T>>>,
  body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError>
where
  T: Transport,
{
  let Json(credentials) = body?;
  if credentials.login.trim().is_empty() || credentials.password.is_empty() {
    return Err(
      edo_core::Error::validation("login and password required").into(),
    );
  }

  let transport = submitter.transport().as_ref();
  let endpoints = submitter.endpoints();
  let session_id =
    session::authenticate(transport, endpoints, &credentials).await?;
  let organizations =
    session::list_own_organizations(transport, endpoints, &session_id)
      .await
      .into_option();

  Ok(Json(AuthResponse { session_id, organizations }))
}
