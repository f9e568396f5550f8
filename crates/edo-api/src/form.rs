//! Decoding of `multipart/form-data` upload requests.
//!
//! Text parts become named fields; every part that carries a filename
//! becomes a file, in the order the client sent them.

use std::collections::HashMap;

use axum::extract::Multipart;
use edo_core::{
  party::RawParty,
  payload::SubmissionMeta,
  session::SessionToken,
  submit::FileInput,
};

use crate::error::ApiError;

/// Prefix of the own-organization fields (`ourInn`, `ourKpp`, …).
pub const OUR_PREFIX: &str = "our";

/// Decoded upload request.
#[derive(Debug, Default)]
pub struct UploadForm {
  pub fields: HashMap<String, String>,
  pub files:  Vec<FileInput>,
}

impl UploadForm {
  pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut form = Self::default();
    while let Some(field) = multipart
      .next_field()
      .await
      .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
      let name = field.name().unwrap_or_default().to_string();
      match field.file_name().map(str::to_owned) {
        Some(file_name) => {
          let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
          form.files.push(FileInput::new(file_name, bytes.to_vec()));
        }
        None => {
          let text = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
          form.fields.insert(name, text);
        }
      }
    }
    Ok(form)
  }

  /// Non-blank value of a text field.
  pub fn field(&self, name: &str) -> Option<String> {
    self
      .fields
      .get(name)
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
      .map(str::to_owned)
  }

  pub fn session(&self) -> Result<SessionToken, ApiError> {
    self
      .field("sessionId")
      .map(SessionToken::new)
      .ok_or_else(|| edo_core::Error::validation("session id required").into())
  }

  /// Identity fields, optionally prefixed (`inn` vs `ourInn`).
  pub fn party(&self, prefix: &str) -> RawParty {
    let get = |name: &str| self.field(&prefixed(prefix, name));
    RawParty {
      tax_id:            get("inn"),
      registration_code: get("kpp"),
      last_name:         get("lastName"),
      first_name:        get("firstName"),
      middle_name:       get("middleName"),
      insurance_number:  get("snils"),
    }
  }

  pub fn meta(&self) -> SubmissionMeta {
    SubmissionMeta {
      date:          self.field("date"),
      number:        self.field("number"),
      note:          self.field("note"),
      document_type: self.field("docType"),
    }
  }

  /// The first uploaded file.
  pub fn take_file(&mut self) -> Result<FileInput, ApiError> {
    if self.files.is_empty() {
      return Err(edo_core::Error::validation("file required").into());
    }
    Ok(self.files.remove(0))
  }
}

/// `prefixed("our", "inn") == "ourInn"`; an empty prefix leaves `name` as is.
fn prefixed(prefix: &str, name: &str) -> String {
  if prefix.is_empty() {
    return name.to_string();
  }
  let mut chars = name.chars();
  match chars.next() {
    Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
    None => prefix.to_string(),
  }
}
