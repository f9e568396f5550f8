//! Composition of the EDO upload server: configuration and the top-level
//! router (JSON API under `/api`, browser form everywhere else).

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use edo_core::{
  EdoConfig, config::DEFAULT_DOCUMENT_TYPE, submit::Submitter,
  transport::Transport,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `EDO_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  pub edo_base_url:          String,
  #[serde(default = "default_static_dir")]
  pub static_dir:            PathBuf,
  pub default_document_type: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_static_dir() -> PathBuf { PathBuf::from("static/") }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn edo_config(&self) -> EdoConfig {
    EdoConfig {
      base_url:              self.edo_base_url.clone(),
      default_document_type: self
        .default_document_type
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Mount the API under `/api` and serve `static_dir` for every other path.
pub fn router<T>(submitter: Arc<Submitter<T>>, static_dir: &Path) -> Router
where
  T: Transport + 'static,
{
  Router::new()
    .nest("/api", edo_api::api_router(submitter))
    .fallback_service(ServeDir::new(static_dir))
    .layer(TraceLayer::new_for_http())
}
