//! Legal parties to a document and the resolver that validates them.
//!
//! A party is identified by its tax id (ИНН). The digit count alone decides
//! what kind of party it is: 10 digits for an organization, 12 for an
//! individual.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, filename::FilenameHints};

// ─── Resolved party ──────────────────────────────────────────────────────────

/// A validated trading party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegalParty {
  /// A legal entity with a 10-digit tax id.
  Organization {
    tax_id:            String,
    /// КПП, nine digits; required when the organization is the counterparty.
    registration_code: Option<String>,
  },
  /// A natural person or sole proprietor with a 12-digit tax id.
  Individual {
    tax_id:           String,
    last_name:        Option<String>,
    first_name:       Option<String>,
    middle_name:      Option<String>,
    /// СНИЛС.
    insurance_number: Option<String>,
  },
}

impl LegalParty {
  pub fn tax_id(&self) -> &str {
    match self {
      Self::Organization { tax_id, .. } | Self::Individual { tax_id, .. } => {
        tax_id
      }
    }
  }

  pub fn is_organization(&self) -> bool {
    matches!(self, Self::Organization { .. })
  }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// Unvalidated identity fields as typed by a user or pulled from a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParty {
  #[serde(alias = "inn")]
  pub tax_id:            Option<String>,
  #[serde(alias = "kpp")]
  pub registration_code: Option<String>,
  pub last_name:         Option<String>,
  pub first_name:        Option<String>,
  pub middle_name:       Option<String>,
  #[serde(alias = "snils")]
  pub insurance_number:  Option<String>,
}

impl RawParty {
  /// A party known only by what its filename says.
  pub fn from_hints(hints: &FilenameHints) -> Self {
    Self {
      tax_id: hints.tax_id.clone(),
      registration_code: hints.registration_code.clone(),
      ..Self::default()
    }
  }

  /// Fill an absent tax id or registration code from `hints`. Explicit values
  /// are never overwritten.
  ///
  /// A registration code belongs to one organization, so it is only taken
  /// from the filename when the filename names the same tax id, or none.
  pub fn fill_from(&mut self, hints: &FilenameHints) {
    if clean(&self.tax_id).is_none() {
      self.tax_id = hints.tax_id.clone();
    }
    if clean(&self.registration_code).is_none() {
      let same_party = match (&hints.tax_id, &self.tax_id) {
        (Some(hinted), Some(own)) => digits(hinted) == digits(own),
        _ => true,
      };
      if same_party {
        self.registration_code = hints.registration_code.clone();
      }
    }
  }

  pub fn resolve(&self) -> Result<LegalParty> { resolve(self) }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Validate `raw` and classify it by tax id length.
pub fn resolve(raw: &RawParty) -> Result<LegalParty> {
  let tax_id = digits(raw.tax_id.as_deref().unwrap_or_default());

  if tax_id.is_empty() {
    return Err(Error::validation("tax id required"));
  }
  if !tax_id.chars().all(|c| c.is_ascii_digit()) {
    return Err(Error::validation("tax id must be numeric"));
  }

  match tax_id.len() {
    10 => Ok(LegalParty::Organization {
      tax_id,
      registration_code: clean(&raw.registration_code),
    }),
    12 => Ok(LegalParty::Individual {
      tax_id,
      last_name: clean(&raw.last_name),
      first_name: clean(&raw.first_name),
      middle_name: clean(&raw.middle_name),
      insurance_number: clean(&raw.insurance_number),
    }),
    _ => Err(Error::validation("tax id must be 10 or 12 digits")),
  }
}

/// `value` with all whitespace removed.
fn digits(value: &str) -> String {
  value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Trimmed value, with blank treated as absent.
fn clean(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}
