//! Assembly of a [`SubmissionRequest`] from resolved parties, file content and
//! metadata.
//!
//! Pure: no I/O happens here. The caller hands the finished request to a
//! [`Transport`](crate::transport::Transport).

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result, filename::FilenameHints, party::LegalParty, wire};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const WIRE_DATE_FORMAT: &str = "%d.%m.%Y";

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Caller-supplied metadata shared by a single submission or a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
  /// Issue date as `YYYY-MM-DD`; today when absent.
  pub date:          Option<String>,
  pub number:        Option<String>,
  pub note:          Option<String>,
  #[serde(alias = "docType")]
  pub document_type: Option<String>,
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// One fully-built document submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
  document_id:   Uuid,
  attachment_id: Uuid,
  file_name:     String,
  file_bytes:    Vec<u8>,
  /// Already in wire format, `DD.MM.YYYY`.
  issued_date:   String,
  number:        String,
  note:          String,
  document_type: String,
  counterparty:  LegalParty,
  our_party:     LegalParty,
}

impl SubmissionRequest {
  pub fn document_id(&self) -> Uuid { self.document_id }

  pub fn attachment_id(&self) -> Uuid { self.attachment_id }

  pub fn file_name(&self) -> &str { &self.file_name }

  pub fn file_bytes(&self) -> &[u8] { &self.file_bytes }

  pub fn issued_date(&self) -> &str { &self.issued_date }

  pub fn number(&self) -> &str { &self.number }

  pub fn note(&self) -> &str { &self.note }

  pub fn document_type(&self) -> &str { &self.document_type }

  pub fn counterparty(&self) -> &LegalParty { &self.counterparty }

  pub fn our_party(&self) -> &LegalParty { &self.our_party }

  /// The JSON-RPC call that submits this request.
  pub fn to_envelope(&self) -> Result<Value> { wire::document_envelope(self) }
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Everything [`build_request`] needs.
#[derive(Debug, Clone)]
pub struct PayloadInput<'a> {
  pub counterparty:          LegalParty,
  pub our_party:             LegalParty,
  pub file_name:             String,
  pub file_bytes:            Vec<u8>,
  pub meta:                  &'a SubmissionMeta,
  /// Hints for the same file; used only to fill gaps.
  pub hints:                 &'a FilenameHints,
  pub default_document_type: &'a str,
}

/// [`build_request`] dated with the local calendar date.
pub fn build_request_today(input: PayloadInput<'_>) -> Result<SubmissionRequest> {
  build_request(input, Local::now().date_naive())
}

/// Validate `input` and produce a request. `today` is the issue date used
/// when `meta.date` is absent.
pub fn build_request(
  input: PayloadInput<'_>,
  today: NaiveDate,
) -> Result<SubmissionRequest> {
  let PayloadInput {
    counterparty,
    our_party,
    file_name,
    file_bytes,
    meta,
    hints,
    default_document_type,
  } = input;

  let counterparty = with_inferred_registration_code(counterparty, hints);
  if let LegalParty::Organization { registration_code: None, .. } = counterparty
  {
    return Err(Error::validation(
      "registration code required for organization counterparties",
    ));
  }

  let issued_date = match non_blank(&meta.date) {
    Some(date) => iso_to_wire_date(date)?,
    None => today.format(WIRE_DATE_FORMAT).to_string(),
  };

  let note = non_blank(&meta.note)
    .map(str::to_owned)
    .or_else(|| hints.period_description.clone())
    .unwrap_or_default();

  let number = non_blank(&meta.number)
    .map(str::to_owned)
    .unwrap_or_else(|| file_stem(&file_name).to_owned());

  let document_type = non_blank(&meta.document_type)
    .unwrap_or(default_document_type)
    .to_owned();

  Ok(SubmissionRequest {
    document_id: Uuid::new_v4(),
    attachment_id: Uuid::new_v4(),
    file_name,
    file_bytes,
    issued_date,
    number,
    note,
    document_type,
    counterparty,
    our_party,
  })
}

/// Attach the filename's registration code to an organization that lacks
/// one, provided the filename does not name a different tax id.
fn with_inferred_registration_code(
  party: LegalParty,
  hints: &FilenameHints,
) -> LegalParty {
  match party {
    LegalParty::Organization { tax_id, registration_code: None }
      if hints.tax_id.as_deref().is_none_or(|t| t == tax_id) =>
    {
      LegalParty::Organization {
        registration_code: hints.registration_code.clone(),
        tax_id,
      }
    }
    other => other,
  }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn file_stem(file_name: &str) -> &str {
  match file_name.rsplit_once('.') {
    Some((stem, _)) if !stem.is_empty() => stem,
    _ => file_name,
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// `YYYY-MM-DD` → `DD.MM.YYYY`.
pub fn iso_to_wire_date(iso: &str) -> Result<String> {
  let date = NaiveDate::parse_from_str(iso.trim(), ISO_DATE_FORMAT)
    .map_err(|_| Error::validation("date must be YYYY-MM-DD"))?;
  Ok(date.format(WIRE_DATE_FORMAT).to_string())
}

/// `DD.MM.YYYY` → `YYYY-MM-DD`.
pub fn wire_to_iso_date(wire: &str) -> Result<String> {
  let date = NaiveDate::parse_from_str(wire.trim(), WIRE_DATE_FORMAT)
    .map_err(|_| Error::validation("date must be DD.MM.YYYY"))?;
  Ok(date.format(ISO_DATE_FORMAT).to_string())
}
