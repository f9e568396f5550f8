//! Metadata hints derived from a document's filename.
//!
//! Filenames are free text written by people, e.g.
//! `Отчет ИНН7712345678 КПП771201001 15-03-2024.docx`. Nothing found here is
//! authoritative: hints only fill gaps left by explicit input.
//!
//! Browsers and multipart decoders frequently hand us a filename whose UTF-8
//! bytes were decoded as ISO-8859-1, one `char` per byte. Every extractor
//! runs [`repair_encoding`] first.

use std::{borrow::Cow, sync::LazyLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ─── Patterns ────────────────────────────────────────────────────────────────

// ASCII digit classes throughout: `\d` would also accept non-ASCII digits.
// Labels must start a word and values must not run into further digits.
static TAX_ID: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?i)(?:^|[^\p{L}])(?:инн|inn)[\s_:№=#\-]*([0-9]{12}|[0-9]{10})(?:[^0-9]|$)",
  )
  .expect("tax id pattern is valid")
});

static REGISTRATION_CODE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)(?:^|[^\p{L}])(?:кпп|kpp)[\s_:№=#\-]*([0-9]{9})(?:[^0-9]|$)")
    .expect("registration code pattern is valid")
});

// The trailing boundary is checked by hand so that adjacent dates separated
// by a single character are both candidates.
static DATE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?:^|[^0-9])([0-9]{2})-([0-9]{2})-([0-9]{4})")
    .expect("date pattern is valid")
});

// ─── Hints ───────────────────────────────────────────────────────────────────

/// Everything that could be inferred from a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilenameHints {
  /// 10 or 12 digits following an `ИНН` label.
  pub tax_id:             Option<String>,
  /// 9 digits following a `КПП` label.
  pub registration_code:  Option<String>,
  /// Weekly-report label derived from a `DD-MM-YYYY` date.
  pub period_description: Option<String>,
}

/// Run every extractor over `name`.
pub fn extract(name: &str) -> FilenameHints {
  let FilenameHints { tax_id, registration_code, .. } =
    extract_tax_identifiers(name);
  FilenameHints {
    tax_id,
    registration_code,
    period_description: extract_period_description(name),
  }
}

// ─── Encoding repair ─────────────────────────────────────────────────────────

/// Undo an ISO-8859-1 misdecoding of UTF-8 text.
///
/// When every char fits in a byte and those bytes form valid UTF-8, the
/// decoded string is returned. Otherwise `name` is returned as-is, so a
/// correctly decoded name passes through untouched.
pub fn repair_encoding(name: &str) -> Cow<'_, str> {
  if name.is_ascii() {
    return Cow::Borrowed(name);
  }
  let bytes: Option<Vec<u8>> =
    name.chars().map(|c| u8::try_from(c).ok()).collect();
  match bytes.and_then(|b| String::from_utf8(b).ok()) {
    Some(repaired) => Cow::Owned(repaired),
    None => Cow::Borrowed(name),
  }
}

// ─── Tax identifiers ─────────────────────────────────────────────────────────

/// Find labeled tax id and registration code tokens. `period_description` is
/// always `None` in the result.
pub fn extract_tax_identifiers(name: &str) -> FilenameHints {
  let name = repair_encoding(name);
  FilenameHints {
    tax_id:             first_group(&TAX_ID, &name),
    registration_code:  first_group(&REGISTRATION_CODE, &name),
    period_description: None,
  }
}

fn first_group(re: &Regex, haystack: &str) -> Option<String> {
  re.captures(haystack)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().to_owned())
}

// ─── Report period ───────────────────────────────────────────────────────────

/// Describe the ISO week of the first valid `DD-MM-YYYY` date in `name`.
///
/// Candidates that do not form a calendar date (e.g. `31-02-2024`) are
/// skipped.
pub fn extract_period_description(name: &str) -> Option<String> {
  let name = repair_encoding(name);
  DATE
    .captures_iter(&name)
    .find_map(|caps| {
      let year_end = caps.get(3)?.end();
      if name[year_end..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
      }
      let day = caps[1].parse().ok()?;
      let month = caps[2].parse().ok()?;
      let year = caps[3].parse().ok()?;
      NaiveDate::from_ymd_opt(year, month, day)
    })
    .map(|date| period_label(iso_week(date)))
}

/// ISO-8601 week number: Monday-start weeks, week 1 holds the first Thursday.
pub fn iso_week(date: NaiveDate) -> u32 { date.iso_week().week() }

pub fn period_label(week: u32) -> String {
  format!("Еженедельный отчет за {week} неделю")
}
