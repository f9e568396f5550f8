//! JSON-RPC shapes exchanged with the remote service.
//!
//! Every call is a `{"jsonrpc":"2.0","method":…,"params":…,"id":0}` envelope.
//! Field names on the wire are Russian; the Rust side keeps English names and
//! maps them with `serde(rename)`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  party::LegalParty,
  payload::SubmissionRequest,
  transport::RawResponse,
};

pub const METHOD_AUTHENTICATE: &str = "СБИС.Аутентифицировать";
pub const METHOD_WRITE_DOCUMENT: &str = "СБИС.ЗаписатьДокумент";
pub const METHOD_LIST_OWN_ORGANIZATIONS: &str = "СБИС.СписокНашихОрганизаций";

/// Header carrying the session token on every non-auth call.
pub const SESSION_HEADER: &str = "X-SBISSessionID";

// ─── Envelope ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Envelope<'a, P> {
  jsonrpc: &'static str,
  method:  &'a str,
  params:  P,
  id:      u32,
}

/// Wrap `params` in a JSON-RPC 2.0 envelope for `method`.
pub fn envelope<P: Serialize>(method: &str, params: P) -> Result<Value> {
  Ok(serde_json::to_value(Envelope {
    jsonrpc: "2.0",
    method,
    params,
    id: 0,
  })?)
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AuthParams<'a> {
  #[serde(rename = "Параметр")]
  parameter: LoginBlock<'a>,
}

#[derive(Serialize)]
struct LoginBlock<'a> {
  #[serde(rename = "Логин")]
  login:    &'a str,
  #[serde(rename = "Пароль")]
  password: &'a str,
}

pub fn auth_envelope(login: &str, password: &str) -> Result<Value> {
  envelope(METHOD_AUTHENTICATE, AuthParams {
    parameter: LoginBlock { login, password },
  })
}

pub fn list_own_organizations_envelope() -> Result<Value> {
  envelope(
    METHOD_LIST_OWN_ORGANIZATIONS,
    serde_json::json!({ "Фильтр": {} }),
  )
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DocumentParams<'a> {
  #[serde(rename = "Документ")]
  document: Document<'a>,
}

#[derive(Serialize)]
struct Document<'a> {
  #[serde(rename = "Идентификатор")]
  id:            Uuid,
  #[serde(rename = "Вложение")]
  attachments:   [Attachment<'a>; 1],
  #[serde(rename = "Дата")]
  date:          &'a str,
  #[serde(rename = "Номер")]
  number:        &'a str,
  #[serde(rename = "Примечание")]
  note:          &'a str,
  #[serde(rename = "Тип")]
  document_type: &'a str,
  #[serde(rename = "Контрагент")]
  counterparty:  PartyBlock<'a>,
  #[serde(rename = "НашаОрганизация")]
  our_party:     PartyBlock<'a>,
}

#[derive(Serialize)]
struct Attachment<'a> {
  #[serde(rename = "Идентификатор")]
  id:       Uuid,
  #[serde(rename = "Служебный")]
  internal: &'static str,
  #[serde(rename = "Тип")]
  kind:     &'static str,
  #[serde(rename = "Файл")]
  file:     FileBlock<'a>,
}

#[derive(Serialize)]
struct FileBlock<'a> {
  #[serde(rename = "Имя")]
  name: &'a str,
  #[serde(rename = "ДвоичныеДанные")]
  data: String,
}

/// The wire form of a [`LegalParty`].
#[derive(Debug, Serialize, PartialEq, Eq)]
pub enum PartyBlock<'a> {
  #[serde(rename = "СвЮЛ")]
  Organization {
    #[serde(rename = "ИНН")]
    tax_id:            &'a str,
    #[serde(rename = "КПП", skip_serializing_if = "Option::is_none")]
    registration_code: Option<&'a str>,
  },
  #[serde(rename = "СвФЛ")]
  Individual {
    #[serde(rename = "ИНН")]
    tax_id:           &'a str,
    #[serde(rename = "Фамилия", skip_serializing_if = "Option::is_none")]
    last_name:        Option<&'a str>,
    #[serde(rename = "Имя", skip_serializing_if = "Option::is_none")]
    first_name:       Option<&'a str>,
    #[serde(rename = "Отчество", skip_serializing_if = "Option::is_none")]
    middle_name:      Option<&'a str>,
    #[serde(rename = "СНИЛС", skip_serializing_if = "Option::is_none")]
    insurance_number: Option<&'a str>,
  },
}

impl<'a> From<&'a LegalParty> for PartyBlock<'a> {
  fn from(party: &'a LegalParty) -> Self {
    match party {
      LegalParty::Organization { tax_id, registration_code } => {
        PartyBlock::Organization {
          tax_id,
          registration_code: registration_code.as_deref(),
        }
      }
      LegalParty::Individual {
        tax_id,
        last_name,
        first_name,
        middle_name,
        insurance_number,
      } => PartyBlock::Individual {
        tax_id,
        last_name: last_name.as_deref(),
        first_name: first_name.as_deref(),
        middle_name: middle_name.as_deref(),
        insurance_number: insurance_number.as_deref(),
      },
    }
  }
}

/// Build the `СБИС.ЗаписатьДокумент` call for `request`.
pub fn document_envelope(request: &SubmissionRequest) -> Result<Value> {
  let document = Document {
    id:            request.document_id(),
    attachments:   [Attachment {
      id:       request.attachment_id(),
      internal: "Нет",
      kind:     "Документ",
      file:     FileBlock {
        name: request.file_name(),
        data: B64.encode(request.file_bytes()),
      },
    }],
    date:          request.issued_date(),
    number:        request.number(),
    note:          request.note(),
    document_type: request.document_type(),
    counterparty:  PartyBlock::from(request.counterparty()),
    our_party:     PartyBlock::from(request.our_party()),
  };
  envelope(METHOD_WRITE_DOCUMENT, DocumentParams { document })
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Check a JSON-RPC response for failure.
///
/// Returns the parsed body, or `None` when a successful response is not
/// JSON. A non-2xx status or a JSON-RPC `error` member becomes
/// [`Error::Upstream`].
pub fn parse_rpc(response: &RawResponse) -> Result<Option<Value>> {
  let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

  let rpc_error = parsed
    .as_ref()
    .and_then(|v| v.get("error"))
    .filter(|e| !e.is_null());

  if !response.is_success() || rpc_error.is_some() {
    let message = rpc_error
      .and_then(rpc_error_message)
      .or_else(|| {
        let body = response.body.trim();
        (!body.is_empty()).then(|| body.to_owned())
      })
      .unwrap_or_else(|| format!("HTTP {}", response.status));
    return Err(Error::Upstream { status: response.status, message });
  }

  Ok(parsed)
}

fn rpc_error_message(error: &Value) -> Option<String> {
  match error {
    Value::String(s) => Some(s.clone()),
    Value::Object(map) => ["message", "details"]
      .iter()
      .find_map(|k| map.get(*k).and_then(Value::as_str))
      .map(str::to_owned)
      .or_else(|| Some(error.to_string())),
    _ => Some(error.to_string()),
  }
}
