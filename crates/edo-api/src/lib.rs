//! JSON HTTP API over the EDO submission pipeline.
//!
//! Exposes an axum [`Router`] backed by a [`Submitter`] over any
//! [`Transport`]. Static files, TLS and tracing layers are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", edo_api::api_router(submitter.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod form;
pub mod upload;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::post};
use edo_core::{submit::Submitter, transport::Transport};

pub use error::ApiError;

/// Largest accepted request body; uploads carry whole documents.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the API router for `submitter`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<T>(submitter: Arc<Submitter<T>>) -> Router<()>
where
  T: Transport + 'static,
{
  Router::new()
    .route("/auth", post(auth::handler::<T>))
    .route("/upload", post(upload::single::<T>))
    .route("/upload-batch", post(upload::batch::<T>))
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(submitter)
}

// ─── Integration tests ────────────────────────────────────────────────────────
