//! `edo-upload`: submit documents to the EDO service from the command line.
//!
//! # Usage
//!
//! ```text
//! edo-upload --base-url https://online.sbis.ru --login user --password secret \
//!   --file "Отчет ИНН7712345678 КПП771201001 15-03-2024.docx" \
//!   --meta '{"ourParty":{"inn":"7700000001","kpp":"770001001"}}'
//! edo-upload --config ~/.config/edo/config.toml --dir ./outbox
//! ```
//!
//! The outcome is printed as JSON on stdout; logs go to stderr.

use std::{
  fs,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use edo_client::HttpTransport;
use edo_core::{
  EdoConfig,
  party::RawParty,
  payload::SubmissionMeta,
  session::{Authenticator, Credentials},
  submit::{BatchItem, BatchResult, FileInput, SingleSubmission, Submitter},
};
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "edo-upload", about = "Submit documents to the EDO service")]
#[command(group(ArgGroup::new("input").required(true).args(["file", "dir"])))]
struct Args {
  /// Path to a TOML config file (base_url, login, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Root URL of the EDO service.
  #[arg(long, env = "EDO_BASE_URL")]
  base_url: Option<String>,

  #[arg(long, env = "EDO_LOGIN")]
  login: Option<String>,

  #[arg(long, env = "EDO_PASSWORD", hide_env_values = true)]
  password: Option<String>,

  /// Submit a single document.
  #[arg(long, value_name = "PATH")]
  file: Option<PathBuf>,

  /// Submit every file in a directory as a batch.
  #[arg(long, value_name = "PATH")]
  dir: Option<PathBuf>,

  /// JSON with `counterparty`, `ourParty` and `date`/`number`/`note`/`docType`.
  #[arg(long, value_name = "JSON")]
  meta: Option<String>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  base_url:              String,
  #[serde(default)]
  login:                 String,
  #[serde(default)]
  password:              String,
  default_document_type: Option<String>,
}

/// Connection settings after merging flags, env and the config file.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
  base_url: String,
  login:    String,
  password: String,
}

impl Settings {
  /// Flags (and their env vars) override the config file.
  fn merge(args: &Args, file: &ConfigFile) -> Result<Self> {
    let pick = |flag: &Option<String>, fallback: &str| {
      flag
        .clone()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| (!fallback.is_empty()).then(|| fallback.to_string()))
    };

    let Some(base_url) = pick(&args.base_url, &file.base_url) else {
      bail!("base URL required (--base-url, EDO_BASE_URL or config file)");
    };
    let Some(login) = pick(&args.login, &file.login) else {
      bail!("login required (--login, EDO_LOGIN or config file)");
    };
    let Some(password) = pick(&args.password, &file.password) else {
      bail!("password required (--password, EDO_PASSWORD or config file)");
    };
    Ok(Self { base_url, login, password })
  }
}

// ─── Submission metadata ──────────────────────────────────────────────────────

/// Decoded `--meta` argument.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
struct CliMeta {
  #[serde(default)]
  counterparty: RawParty,
  #[serde(default)]
  our_party:    RawParty,
  #[serde(flatten)]
  meta:         SubmissionMeta,
}

impl CliMeta {
  fn parse(raw: Option<&str>) -> Result<Self> {
    match raw {
      Some(raw) => serde_json::from_str(raw).context("parsing --meta"),
      None => Ok(Self::default()),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let settings = Settings::merge(&args, &file_cfg)?;
  let cli_meta = CliMeta::parse(args.meta.as_deref())?;

  let mut edo_config = EdoConfig::new(settings.base_url);
  if let Some(doc_type) = file_cfg.default_document_type {
    edo_config.default_document_type = doc_type;
  }

  let transport =
    Arc::new(HttpTransport::new().context("failed to build HTTP client")?);
  let authenticator = Authenticator::new(
    transport.clone(),
    edo_config.endpoints(),
    Credentials { login: settings.login, password: settings.password },
  );
  let session = authenticator.session().await.context("authentication failed")?;
  let submitter = Submitter::new(transport, edo_config);

  let output = if let Some(path) = &args.file {
    let file = read_file(path)?;
    let outcome = submitter
      .submit_one(&session, SingleSubmission {
        counterparty: cli_meta.counterparty,
        our_party: cli_meta.our_party,
        file,
        meta: cli_meta.meta,
      })
      .await
      .with_context(|| format!("submitting {}", path.display()))?;
    serde_json::to_string_pretty(&outcome)?
  } else if let Some(dir) = &args.dir {
    let mut files = Vec::new();
    let mut unreadable = Vec::new();
    for (index, path) in list_files(dir)?.iter().enumerate() {
      match read_file(path) {
        Ok(file) => files.push(file),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "skipping unreadable file");
          unreadable.push((index, failed_item(path, &e)));
        }
      }
    }
    info!(dir = %dir.display(), files = files.len(), "submitting batch");
    let result = submitter
      .submit_batch(&session, &cli_meta.our_party, &cli_meta.meta, files)
      .await;
    serde_json::to_string_pretty(&with_unreadable(result, unreadable))?
  } else {
    bail!("either --file or --dir is required");
  };

  println!("{output}");
  Ok(())
}

// ─── Files ────────────────────────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<FileInput> {
  let bytes =
    fs::read(path).with_context(|| format!("reading {}", path.display()))?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .with_context(|| format!("{} has no file name", path.display()))?;
  Ok(FileInput::new(file_name, bytes))
}

fn failed_item(path: &Path, error: &anyhow::Error) -> BatchItem {
  BatchItem {
    file_name:   path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| path.display().to_string()),
    ok:          false,
    document_id: None,
    error:       Some(format!("{error:#}")),
  }
}

/// Put files that could not be read back into the report at their original
/// positions. `unreadable` is ordered by index.
fn with_unreadable(
  mut result: BatchResult,
  unreadable: Vec<(usize, BatchItem)>,
) -> BatchResult {
  for (index, item) in unreadable {
    let index = index.min(result.per_file.len());
    result.per_file.insert(index, item);
  }
  result.total = result.per_file.len();
  result
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in
    fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?
  {
    let entry = entry?;
    if entry.file_type()?.is_file() {
      files.push(entry.path());
    }
  }
  files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
  Ok(files)
}
