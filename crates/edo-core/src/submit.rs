//! Single and batch document submission.
//!
//! Each attempt moves `Unvalidated → Validated → Submitted → {Succeeded,
//! Failed}`. Validation failures end the attempt before the transport is
//! touched. In a batch every attempt's failure is recorded as a value and
//! never stops the remaining files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
  EdoConfig, EdoEndpoints, Error, Result,
  filename::{self, FilenameHints},
  party::{LegalParty, RawParty},
  payload::{self, PayloadInput, SubmissionMeta, SubmissionRequest},
  session::SessionToken,
  transport::{RawResponse, Transport},
  wire,
};

/// Recorded for batch files whose name carries no tax id.
pub const TAX_ID_NOT_IN_FILENAME: &str = "tax id not found in filename";

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A document's content together with its declared filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
  pub file_name: String,
  pub bytes:     Vec<u8>,
}

impl FileInput {
  pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
    Self { file_name: file_name.into(), bytes: bytes.into() }
  }
}

/// Input for [`Submitter::submit_one`].
#[derive(Debug, Clone)]
pub struct SingleSubmission {
  pub counterparty: RawParty,
  pub our_party:    RawParty,
  pub file:         FileInput,
  pub meta:         SubmissionMeta,
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// What the remote service said about one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
  pub status:      u16,
  pub raw_body:    String,
  /// `None` when a successful response was not JSON.
  pub parsed_body: Option<Value>,
  /// `None` when the response did not name the stored document.
  pub document_id: Option<String>,
}

/// One file's entry in a [`BatchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
  pub file_name:   String,
  pub ok:          bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub document_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:       Option<String>,
}

impl BatchItem {
  fn from_attempt(
    file_name: String,
    attempt: &Result<SubmissionOutcome>,
  ) -> Self {
    match attempt {
      Ok(outcome) => Self {
        file_name,
        ok: true,
        document_id: outcome.document_id.clone(),
        error: None,
      },
      Err(e) => Self {
        file_name,
        ok: false,
        document_id: None,
        error: Some(e.to_string()),
      },
    }
  }
}

/// Per-file outcomes of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
  pub total:    usize,
  pub per_file: Vec<BatchItem>,
}

impl BatchResult {
  pub fn succeeded(&self) -> usize {
    self.per_file.iter().filter(|i| i.ok).count()
  }

  pub fn failed(&self) -> usize { self.total - self.succeeded() }
}

// ─── Submitter ───────────────────────────────────────────────────────────────

/// Drives submissions through a [`Transport`].
///
/// Cheap to share behind an `Arc`; holds no per-submission state.
pub struct Submitter<T> {
  transport: Arc<T>,
  config:    EdoConfig,
  endpoints: EdoEndpoints,
}

impl<T: Transport> Submitter<T> {
  pub fn new(transport: Arc<T>, config: EdoConfig) -> Self {
    let endpoints = config.endpoints();
    Self { transport, config, endpoints }
  }

  pub fn transport(&self) -> &Arc<T> { &self.transport }

  pub fn config(&self) -> &EdoConfig { &self.config }

  pub fn endpoints(&self) -> &EdoEndpoints { &self.endpoints }

  // ── Single ──────────────────────────────────────────────────────────────

  /// Resolve both parties, build one request and submit it.
  ///
  /// Gaps in the counterparty (tax id, registration code) are filled from
  /// the filename. Any error is returned unchanged.
  pub async fn submit_one(
    &self,
    session: &SessionToken,
    submission: SingleSubmission,
  ) -> Result<SubmissionOutcome> {
    let SingleSubmission { mut counterparty, our_party, file, meta } =
      submission;

    let file = FileInput {
      file_name: filename::repair_encoding(&file.file_name).into_owned(),
      bytes:     file.bytes,
    };
    let hints = filename::extract(&file.file_name);
    counterparty.fill_from(&hints);

    let counterparty = counterparty.resolve()?;
    let our_party = our_party.resolve()?;
    self
      .submit_resolved(session, counterparty, &our_party, file, &meta, &hints)
      .await
  }

  /// Build and submit a request for parties that are already resolved.
  pub async fn submit_resolved(
    &self,
    session: &SessionToken,
    counterparty: LegalParty,
    our_party: &LegalParty,
    file: FileInput,
    meta: &SubmissionMeta,
    hints: &FilenameHints,
  ) -> Result<SubmissionOutcome> {
    let request = payload::build_request_today(PayloadInput {
      counterparty,
      our_party: our_party.clone(),
      file_name: file.file_name,
      file_bytes: file.bytes,
      meta,
      hints,
      default_document_type: &self.config.default_document_type,
    })?;
    self.send(session, &request).await
  }

  /// Submit a built request and interpret the reply.
  pub async fn send(
    &self,
    session: &SessionToken,
    request: &SubmissionRequest,
  ) -> Result<SubmissionOutcome> {
    let body = request.to_envelope()?;
    debug!(
      document_id = %request.document_id(),
      file_name = request.file_name(),
      "submitting document"
    );

    let response = self
      .transport
      .post_json(&self.endpoints.service, Some(session), &body)
      .await?;
    let outcome = interpret_response(response)?;

    info!(
      file_name = request.file_name(),
      status = outcome.status,
      document_id = outcome.document_id.as_deref().unwrap_or("-"),
      "document submitted"
    );
    Ok(outcome)
  }

  // ── Batch ───────────────────────────────────────────────────────────────

  /// Submit every file in `files` as its own document, in order.
  ///
  /// The counterparty of each file is taken from its name. The result has
  /// exactly one entry per input file, in input order; one file's failure
  /// never affects the others.
  pub async fn submit_batch(
    &self,
    session: &SessionToken,
    our_party: &RawParty,
    meta: &SubmissionMeta,
    files: Vec<FileInput>,
  ) -> BatchResult {
    let our_party = our_party.resolve();
    let total = files.len();
    let mut per_file = Vec::with_capacity(total);

    for file in files {
      let file_name = filename::repair_encoding(&file.file_name).into_owned();
      let attempt = match &our_party {
        Ok(our_party) => {
          let file = FileInput { file_name: file_name.clone(), bytes: file.bytes };
          self.submit_batch_item(session, our_party, meta, file).await
        }
        Err(e) => Err(Error::validation(e.to_string())),
      };

      if let Err(e) = &attempt {
        warn!(file_name = %file_name, error = %e, "batch item failed");
      }
      per_file.push(BatchItem::from_attempt(file_name, &attempt));
    }

    let result = BatchResult { total, per_file };
    info!(
      total = result.total,
      succeeded = result.succeeded(),
      failed = result.failed(),
      "batch finished"
    );
    result
  }

  async fn submit_batch_item(
    &self,
    session: &SessionToken,
    our_party: &LegalParty,
    meta: &SubmissionMeta,
    file: FileInput,
  ) -> Result<SubmissionOutcome> {
    let hints = filename::extract(&file.file_name);
    if hints.tax_id.is_none() {
      return Err(Error::validation(TAX_ID_NOT_IN_FILENAME));
    }
    let counterparty = RawParty::from_hints(&hints).resolve()?;
    self
      .submit_resolved(session, counterparty, our_party, file, meta, &hints)
      .await
  }
}

// ─── Response interpretation ─────────────────────────────────────────────────

/// Turn a submission response into an outcome.
///
/// Error statuses and JSON-RPC errors fail. A successful response that is not
/// JSON is still a success: the raw text is kept and no document id is
/// reported.
pub fn interpret_response(response: RawResponse) -> Result<SubmissionOutcome> {
  let parsed = wire::parse_rpc(&response)?;
  if parsed.is_none() {
    warn!(status = response.status, "submission response is not JSON");
  }

  let document_id = parsed
    .as_ref()
    .and_then(|v| v.get("result"))
    .and_then(|r| r.get("Идентификатор"))
    .and_then(Value::as_str)
    .map(str::to_owned);

  Ok(SubmissionOutcome {
    status: response.status,
    raw_body: response.body,
    parsed_body: parsed,
    document_id,
  })
}
