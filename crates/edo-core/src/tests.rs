//! Pipeline tests against a scripted in-memory transport.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
  time::Duration,
};

use serde_json::{Value, json};

use crate::{
  EdoConfig, Error,
  party::RawParty,
  payload::SubmissionMeta,
  session::{Authenticator, Availability, Credentials, SessionToken, authenticate, list_own_organizations},
  submit::{FileInput, SingleSubmission, Submitter, TAX_ID_NOT_IN_FILENAME},
  transport::{RawResponse, Transport},
  wire,
};

// ─── Fake transport ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
  url:     String,
  session: Option<String>,
  body:    Value,
}

/// Replays scripted responses in order and records every call.
/// Runs out of script → `Error::Transport`.
#[derive(Default)]
struct FakeTransport {
  script: Mutex<VecDeque<crate::Result<RawResponse>>>,
  calls:  Mutex<Vec<Call>>,
  delay:  Option<Duration>,
}

impl FakeTransport {
  fn with(responses: Vec<crate::Result<RawResponse>>) -> Self {
    Self {
      script: Mutex::new(responses.into()),
      ..Self::default()
    }
  }

  fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }
}

impl Transport for FakeTransport {
  async fn post_json(
    &self,
    url: &str,
    session: Option<&SessionToken>,
    body: &Value,
  ) -> crate::Result<RawResponse> {
    self.calls.lock().unwrap().push(Call {
      url:     url.to_string(),
      session: session.map(|s| s.as_str().to_string()),
      body:    body.clone(),
    });
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    self
      .script
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(Error::Transport("script exhausted".into())))
  }
}

fn ok_json(v: Value) -> crate::Result<RawResponse> {
  Ok(RawResponse::new(200, v.to_string()))
}

fn stored(id: &str) -> crate::Result<RawResponse> {
  ok_json(json!({ "jsonrpc": "2.0", "result": { "Идентификатор": id }, "id": 0 }))
}

fn config() -> EdoConfig { EdoConfig::new("https://edo.example") }

fn session() -> SessionToken { SessionToken::new("sid-1") }

fn credentials() -> Credentials {
  Credentials { login: "user".into(), password: "secret".into() }
}

fn our_party() -> RawParty {
  RawParty {
    tax_id: Some("7700000001".into()),
    registration_code: Some("770001001".into()),
    ..RawParty::default()
  }
}

fn mojibake(s: &str) -> String { s.bytes().map(char::from).collect() }

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn authenticate_reads_result_field() {
  let transport =
    FakeTransport::with(vec![ok_json(json!({ "jsonrpc": "2.0", "result": "sid-1" }))]);
  let token = authenticate(&transport, &config().endpoints(), &credentials())
    .await
    .unwrap();
  assert_eq!(token, session());

  let calls = transport.calls();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].url, "https://edo.example/auth/service/");
  assert_eq!(calls[0].session, None);
  assert_eq!(calls[0].body["method"], wire::METHOD_AUTHENTICATE);
}

#[tokio::test]
async fn authenticate_falls_back_to_alternate_field() {
  let transport = FakeTransport::with(vec![ok_json(json!({ "sid": "sid-2" }))]);
  let token = authenticate(&transport, &config().endpoints(), &credentials())
    .await
    .unwrap();
  assert_eq!(token.as_str(), "sid-2");
}

#[tokio::test]
async fn authenticate_rejection_is_upstream_error() {
  let transport = FakeTransport::with(vec![Ok(RawResponse::new(
    401,
    r#"{"error":{"message":"wrong password"}}"#,
  ))]);
  let err = authenticate(&transport, &config().endpoints(), &credentials())
    .await
    .unwrap_err();
  match err {
    Error::Upstream { status, message } => {
      assert_eq!(status, 401);
      assert_eq!(message, "wrong password");
    }
    other => panic!("unexpected: {other:?}"),
  }
}

#[tokio::test]
async fn authenticate_without_token_is_malformed() {
  let transport = FakeTransport::with(vec![ok_json(json!({ "result": null }))]);
  let err = authenticate(&transport, &config().endpoints(), &credentials())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MalformedResponse { .. }));
}

#[tokio::test]
async fn authenticator_caches_token() {
  let transport = Arc::new(FakeTransport::with(vec![ok_json(
    json!({ "result": "sid-1" }),
  )]));
  let auth =
    Authenticator::new(transport.clone(), config().endpoints(), credentials());

  assert!(auth.cached().is_none());
  assert_eq!(auth.session().await.unwrap(), session());
  assert_eq!(auth.session().await.unwrap(), session());
  assert_eq!(auth.cached(), Some(&session()));
  assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn authenticator_is_single_flight() {
  let transport = Arc::new(FakeTransport {
    delay: Some(Duration::from_millis(20)),
    ..FakeTransport::with(vec![ok_json(json!({ "result": "sid-1" }))])
  });
  let auth =
    Authenticator::new(transport.clone(), config().endpoints(), credentials());

  let (a, b, c) = tokio::join!(auth.session(), auth.session(), auth.session());
  assert_eq!(a.unwrap(), session());
  assert_eq!(b.unwrap(), session());
  assert_eq!(c.unwrap(), session());
  assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn authenticator_retries_after_failure() {
  let transport = Arc::new(FakeTransport::with(vec![
    Ok(RawResponse::new(500, "boom")),
    ok_json(json!({ "result": "sid-1" })),
  ]));
  let auth =
    Authenticator::new(transport.clone(), config().endpoints(), credentials());

  assert!(auth.session().await.is_err());
  assert!(auth.cached().is_none());
  assert_eq!(auth.session().await.unwrap(), session());
  assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn own_organizations_available() {
  let transport = FakeTransport::with(vec![ok_json(json!({
    "result": { "Организации": [{ "ИНН": "7700000001" }] }
  }))]);
  let orgs =
    list_own_organizations(&transport, &config().endpoints(), &session()).await;
  assert_eq!(
    orgs,
    Availability::Available(json!({ "Организации": [{ "ИНН": "7700000001" }] }))
  );

  let calls = transport.calls();
  assert_eq!(calls[0].session.as_deref(), Some("sid-1"));
  assert_eq!(calls[0].body["method"], wire::METHOD_LIST_OWN_ORGANIZATIONS);
}

#[tokio::test]
async fn own_organizations_degrade_silently() {
  // Network failure.
  let transport = FakeTransport::with(vec![]);
  let orgs =
    list_own_organizations(&transport, &config().endpoints(), &session()).await;
  assert!(!orgs.is_available());

  // Garbage body.
  let transport =
    FakeTransport::with(vec![Ok(RawResponse::new(200, "not json"))]);
  let orgs =
    list_own_organizations(&transport, &config().endpoints(), &session()).await;
  assert!(matches!(orgs, Availability::Unavailable { .. }));
}

#[tokio::test]
async fn authenticator_lists_organizations_after_login() {
  let transport = Arc::new(FakeTransport::with(vec![
    ok_json(json!({ "result": "sid-1" })),
    Ok(RawResponse::new(502, "bad gateway")),
  ]));
  let auth =
    Authenticator::new(transport.clone(), config().endpoints(), credentials());

  let orgs = auth.own_organizations().await.unwrap();
  assert!(orgs.into_option().is_none());
  assert_eq!(auth.cached(), Some(&session()));
}

// ─── Single submission ───────────────────────────────────────────────────────

#[tokio::test]
async fn single_submission_end_to_end() {
  let transport = Arc::new(FakeTransport::with(vec![stored("doc-1")]));
  let submitter = Submitter::new(transport.clone(), config());

  let outcome = submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty::default(),
      our_party:    our_party(),
      file:         FileInput::new(
        mojibake("Отчет ИНН7712345678 КПП771201001 15-03-2024.docx"),
        b"content".to_vec(),
      ),
      meta:         SubmissionMeta::default(),
    })
    .await
    .unwrap();

  assert_eq!(outcome.status, 200);
  assert_eq!(outcome.document_id.as_deref(), Some("doc-1"));
  assert!(outcome.parsed_body.is_some());

  let calls = transport.calls();
  assert_eq!(calls.len(), 1);
  assert_eq!(calls[0].url, "https://edo.example/service/?srv=1");
  assert_eq!(calls[0].session.as_deref(), Some("sid-1"));

  let doc = &calls[0].body["params"]["Документ"];
  assert_eq!(
    doc["Вложение"][0]["Файл"]["Имя"],
    "Отчет ИНН7712345678 КПП771201001 15-03-2024.docx"
  );
  assert_eq!(doc["Контрагент"]["СвЮЛ"]["ИНН"], "7712345678");
  assert_eq!(doc["Контрагент"]["СвЮЛ"]["КПП"], "771201001");
  assert_eq!(doc["Примечание"], "Еженедельный отчет за 11 неделю");
}

#[tokio::test]
async fn explicit_counterparty_overrides_filename() {
  let transport = Arc::new(FakeTransport::with(vec![stored("doc-1")]));
  let submitter = Submitter::new(transport.clone(), config());

  submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty {
        tax_id: Some("500100732259".into()),
        last_name: Some("Иванов".into()),
        ..RawParty::default()
      },
      our_party:    our_party(),
      file:         FileInput::new("ИНН7712345678.pdf", b"x".to_vec()),
      meta:         SubmissionMeta {
        note: Some("explicit note".into()),
        ..SubmissionMeta::default()
      },
    })
    .await
    .unwrap();

  let doc = &transport.calls()[0].body["params"]["Документ"];
  assert_eq!(doc["Контрагент"]["СвФЛ"]["ИНН"], "500100732259");
  assert_eq!(doc["Контрагент"]["СвФЛ"]["Фамилия"], "Иванов");
  assert_eq!(doc["Примечание"], "explicit note");
}

#[tokio::test]
async fn missing_registration_code_never_reaches_transport() {
  let transport = Arc::new(FakeTransport::default());
  let submitter = Submitter::new(transport.clone(), config());

  let err = submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty {
        tax_id: Some("7712345678".into()),
        ..RawParty::default()
      },
      our_party:    our_party(),
      file:         FileInput::new("contract.pdf", b"x".to_vec()),
      meta:         SubmissionMeta::default(),
    })
    .await
    .unwrap_err();

  assert_eq!(
    err.to_string(),
    "registration code required for organization counterparties"
  );
  assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn invalid_own_party_never_reaches_transport() {
  let transport = Arc::new(FakeTransport::default());
  let submitter = Submitter::new(transport.clone(), config());

  let err = submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty::default(),
      our_party:    RawParty::default(),
      file:         FileInput::new("ИНН500100732259.pdf", b"x".to_vec()),
      meta:         SubmissionMeta::default(),
    })
    .await
    .unwrap_err();

  assert_eq!(err.to_string(), "tax id required");
  assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn upstream_rejection_propagates() {
  let transport = Arc::new(FakeTransport::with(vec![Ok(RawResponse::new(
    403,
    r#"{"error":{"message":"access denied"}}"#,
  ))]));
  let submitter = Submitter::new(transport, config());

  let err = submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty::default(),
      our_party:    our_party(),
      file:         FileInput::new("ИНН500100732259.pdf", b"x".to_vec()),
      meta:         SubmissionMeta::default(),
    })
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Upstream { status: 403, .. }));
}

#[tokio::test]
async fn non_json_success_keeps_raw_body() {
  let transport =
    Arc::new(FakeTransport::with(vec![Ok(RawResponse::new(200, "OK"))]));
  let submitter = Submitter::new(transport, config());

  let outcome = submitter
    .submit_one(&session(), SingleSubmission {
      counterparty: RawParty::default(),
      our_party:    our_party(),
      file:         FileInput::new("ИНН500100732259.pdf", b"x".to_vec()),
      meta:         SubmissionMeta::default(),
    })
    .await
    .unwrap();

  assert_eq!(outcome.raw_body, "OK");
  assert_eq!(outcome.parsed_body, None);
  assert_eq!(outcome.document_id, None);
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_isolates_failures_and_keeps_order() {
  // The second file's counterparty is an organization with no КПП, so it
  // fails validation and consumes no scripted response.
  let transport =
    Arc::new(FakeTransport::with(vec![stored("doc-a"), stored("doc-c")]));
  let submitter = Submitter::new(transport.clone(), config());

  let result = submitter
    .submit_batch(&session(), &our_party(), &SubmissionMeta::default(), vec![
      FileInput::new("a ИНН500100732259.pdf", b"a".to_vec()),
      FileInput::new("b ИНН7712345678.pdf", b"b".to_vec()),
      FileInput::new("c ИНН7712345678 КПП771201001.pdf", b"c".to_vec()),
    ])
    .await;

  assert_eq!(result.total, 3);
  let names: Vec<_> =
    result.per_file.iter().map(|i| i.file_name.as_str()).collect();
  assert_eq!(names, [
    "a ИНН500100732259.pdf",
    "b ИНН7712345678.pdf",
    "c ИНН7712345678 КПП771201001.pdf"
  ]);

  assert!(result.per_file[0].ok);
  assert_eq!(result.per_file[0].document_id.as_deref(), Some("doc-a"));
  assert!(!result.per_file[1].ok);
  assert_eq!(
    result.per_file[1].error.as_deref(),
    Some("registration code required for organization counterparties")
  );
  assert!(result.per_file[2].ok);
  assert_eq!(result.per_file[2].document_id.as_deref(), Some("doc-c"));

  assert_eq!(result.succeeded(), 2);
  assert_eq!(result.failed(), 1);
  assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn batch_skips_files_without_tax_id() {
  let transport = Arc::new(FakeTransport::with(vec![stored("doc-b")]));
  let submitter = Submitter::new(transport.clone(), config());

  let result = submitter
    .submit_batch(&session(), &our_party(), &SubmissionMeta::default(), vec![
      FileInput::new("scan.pdf", b"a".to_vec()),
      FileInput::new("ИНН500100732259.pdf", b"b".to_vec()),
    ])
    .await;

  assert_eq!(result.per_file[0].error.as_deref(), Some(TAX_ID_NOT_IN_FILENAME));
  assert!(result.per_file[1].ok);
  assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn batch_continues_after_upstream_and_transport_errors() {
  let transport = Arc::new(FakeTransport::with(vec![
    Ok(RawResponse::new(500, "internal")),
    Err(Error::Transport("connection reset".into())),
    stored("doc-c"),
  ]));
  let submitter = Submitter::new(transport.clone(), config());

  let result = submitter
    .submit_batch(&session(), &our_party(), &SubmissionMeta::default(), vec![
      FileInput::new("1 ИНН500100732259.pdf", b"1".to_vec()),
      FileInput::new("2 ИНН500100732259.pdf", b"2".to_vec()),
      FileInput::new("3 ИНН500100732259.pdf", b"3".to_vec()),
    ])
    .await;

  let oks: Vec<_> = result.per_file.iter().map(|i| i.ok).collect();
  assert_eq!(oks, [false, false, true]);
  assert!(result.per_file[0].error.as_deref().unwrap().contains("internal"));
  assert!(
    result.per_file[1]
      .error
      .as_deref()
      .unwrap()
      .contains("connection reset")
  );
}

#[tokio::test]
async fn batch_with_invalid_own_party_fails_every_item() {
  let transport = Arc::new(FakeTransport::default());
  let submitter = Submitter::new(transport.clone(), config());

  let result = submitter
    .submit_batch(
      &session(),
      &RawParty { tax_id: Some("123".into()), ..RawParty::default() },
      &SubmissionMeta::default(),
      vec![
        FileInput::new("ИНН500100732259.pdf", b"1".to_vec()),
        FileInput::new("ИНН500100732260.pdf", b"2".to_vec()),
      ],
    )
    .await;

  assert_eq!(result.total, 2);
  assert!(result.per_file.iter().all(|i| {
    !i.ok && i.error.as_deref() == Some("tax id must be 10 or 12 digits")
  }));
  assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn batch_repairs_filenames() {
  let transport = Arc::new(FakeTransport::with(vec![stored("doc-1")]));
  let submitter = Submitter::new(transport, config());

  let result = submitter
    .submit_batch(&session(), &our_party(), &SubmissionMeta::default(), vec![
      FileInput::new(mojibake("Акт ИНН500100732259.pdf"), b"1".to_vec()),
    ])
    .await;

  assert_eq!(result.per_file[0].file_name, "Акт ИНН500100732259.pdf");
  assert!(result.per_file[0].ok);
}

#[test]
fn batch_result_serializes_camel_case() {
  let result = crate::submit::BatchResult {
    total:    1,
    per_file: vec![crate::submit::BatchItem {
      file_name:   "a.pdf".into(),
      ok:          false,
      document_id: None,
      error:       Some(TAX_ID_NOT_IN_FILENAME.into()),
    }],
  };
  assert_eq!(
    serde_json::to_value(&result).unwrap(),
    json!({
      "total": 1,
      "perFile": [{ "fileName": "a.pdf", "ok": false, "error": TAX_ID_NOT_IN_FILENAME }]
    })
  );
}
