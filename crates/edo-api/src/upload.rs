//! Handlers for the upload endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/upload` | One `file` part; counterparty fields (`inn`, `kpp`, …) optional when the filename carries them |
//! | `POST` | `/upload-batch` | One or more `files` parts; counterparty taken from each filename |
//!
//! Both take `sessionId`, the own-party fields (`ourInn`, `ourKpp`, …) and the
//! metadata fields `date`, `number`, `note`, `docType`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartRejection},
};
use edo_core::{
  submit::{BatchResult, SingleSubmission, SubmissionOutcome, Submitter},
  transport::Transport,
};

use crate::{
  error::ApiError,
  form::{OUR_PREFIX, UploadForm},
};

/// `POST /upload`
pub async fn single<T>(
  State(submitter): State<Arc<Submitter<T>>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SubmissionOutcome>, ApiError>
where
  T: Transport,
{
  let mut form = UploadForm::read(multipart?).await?;
  let session = form.session()?;
  let file = form.take_file()?;

  let submission = SingleSubmission {
    counterparty: form.party(""),
    our_party: form.party(OUR_PREFIX),
    file,
    meta: form.meta(),
  };
  let outcome = submitter.submit_one(&session, submission).await?;
  Ok(Json(outcome))
}

/// `POST /upload-batch`
///
/// Always 200 once the batch ran; per-file failures are in the body.
pub async fn batch<T>(
  State(submitter): State<Arc<Submitter<T>>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResult>, ApiError>
where
  T: Transport,
{
  let form = UploadForm::read(multipart?).await?;
  let session = form.session()?;
  if form.files.is_empty() {
    return Err(edo_core::Error::validation("at least one file required").into());
  }

  let our_party = form.party(OUR_PREFIX);
  let meta = form.meta();
  let result = submitter
    .submit_batch(&session, &our_party, &meta, form.files)
    .await;
  Ok(Json(result))
}
