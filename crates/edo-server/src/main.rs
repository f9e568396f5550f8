//! edo-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `EDO_*`
//! environment variables, then serves the upload API under `/api` and the
//! browser form from `static_dir`.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! edo_base_url = "https://online.sbis.ru"
//! static_dir = "static/"
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use edo_client::HttpTransport;
use edo_core::submit::Submitter;
use edo_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "EDO document upload server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("EDO"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let transport =
    HttpTransport::new().context("failed to build HTTP client")?;
  let submitter =
    Arc::new(Submitter::new(Arc::new(transport), server_cfg.edo_config()));

  let app = edo_server::router(submitter, &server_cfg.static_dir);
  let address = server_cfg.address();

  tracing::info!(
    edo = %server_cfg.edo_base_url,
    static_dir = %server_cfg.static_dir.display(),
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
