use fieldreport_sync::{ApiConfig, HttpRemoteClient, RemoteClient, RemoteError};
use fieldreport_types::{GeoPoint, LocalId, OccurrencePatch, OccurrencePayload, RemoteId};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpRemoteClient {
    HttpRemoteClient::new(ApiConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
}

fn payload() -> OccurrencePayload {
    OccurrencePayload {
        kind: "traffic".into(),
        occurred_at: Utc.with_ymd_and_hms(2026, 5, 2, 14, 45, 0).unwrap(),
        vehicle: "V-21".into(),
        team: "charlie".into(),
        description: "lane blocked by debris".into(),
        photos: vec!["file:///p1.jpg".into()],
        location: Some(GeoPoint {
            latitude: -23.55,
            longitude: -46.63,
            accuracy: Some(8.0),
            captured_at: Some(Utc.with_ymd_and_hms(2026, 5, 2, 14, 44, 0).unwrap()),
        }),
        signature: Some("base64-sig".into()),
        notes: Some("cleared by 16:00".into()),
    }
}

fn api_occurrence(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "tipo": "traffic",
        "dataHora": "2026-05-02T14:45:00Z",
        "viatura": "V-21",
        "equipe": "charlie",
        "descricao": "lane blocked by debris",
        "fotos": ["file:///p1.jpg"],
        "localizacao": {
            "latitude": -23.55,
            "longitude": -46.63,
            "accuracy": 8.0,
            "capturedAt": "2026-05-02T14:44:00Z"
        },
        "assinaturaVitimado": "base64-sig",
        "notas": "cleared by 16:00",
        "createdAt": "2026-05-02T14:46:00Z",
        "updatedAt": "2026-05-02T14:46:00Z"
    })
}

#[tokio::test]
async fn create_sends_backend_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/occurrences"))
        .and(body_partial_json(json!({
            "tipo": "traffic",
            "dataHora": "2026-05-02T14:45:00Z",
            "viatura": "V-21",
            "equipe": "charlie",
            "descricao": "lane blocked by debris",
            "fotos": ["file:///p1.jpg"],
            "localizacao": { "latitude": -23.55, "longitude": -46.63 },
            "assinatura": "base64-sig",
            "notas": "cleared by 16:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(api_occurrence("65a1b2c3")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.create(&payload()).await.unwrap();

    assert_eq!(record.id, RemoteId::new("65a1b2c3"));
    assert_eq!(record.payload, payload());
}

#[tokio::test]
async fn bearer_token_attached_once_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/occurrences"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_token("secret-token").await;
    let records = client.list().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn validation_failure_classifies_as_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/occurrences"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "tipo is required" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.create(&payload()).await.unwrap_err();

    match err {
        RemoteError::Rejected { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "tipo is required");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_classifies_as_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/occurrences"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.create(&payload()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn unreachable_backend_classifies_as_transport() {
    let client = HttpRemoteClient::new(ApiConfig {
        // Nothing listens here.
        base_url: "http://127.0.0.1:9".into(),
        timeout: Duration::from_millis(500),
    });

    let err = client.create(&payload()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn update_sends_only_present_patch_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/occurrences/65a1b2c3"))
        .and(body_json(json!({ "descricao": "updated description" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_occurrence("65a1b2c3")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let patch = OccurrencePatch {
        description: Some("updated description".into()),
        ..Default::default()
    };
    let record = client.update(&RemoteId::new("65a1b2c3"), &patch).await.unwrap();
    assert_eq!(record.id, RemoteId::new("65a1b2c3"));
}

#[tokio::test]
async fn delete_accepts_status_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/occurrences/65a1b2c3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "occurrence deleted" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete(&RemoteId::new("65a1b2c3")).await.unwrap();
}

#[tokio::test]
async fn get_and_list_endpoints_decode_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/occurrences/65a1b2c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_occurrence("65a1b2c3")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/occurrences"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([api_occurrence("65a1b2c3"), api_occurrence("65d4e5f6")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/occurrences/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let one = client.get(&RemoteId::new("65a1b2c3")).await.unwrap();
    assert_eq!(one.payload.kind, "traffic");
    assert_eq!(one.payload.signature.as_deref(), Some("base64-sig"));

    let all = client.list().await.unwrap();
    assert_eq!(all.len(), 2);

    let pending = client.list_pending().await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn legacy_signature_key_still_decodes() {
    let server = MockServer::start().await;
    let mut body = api_occurrence("65a1b2c3");
    let obj = body.as_object_mut().unwrap();
    obj.remove("assinaturaVitimado");
    obj.insert("assinatura".into(), json!("legacy-sig"));

    Mock::given(method("GET"))
        .and(path("/occurrences/65a1b2c3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let record = client.get(&RemoteId::new("65a1b2c3")).await.unwrap();
    assert_eq!(record.payload.signature.as_deref(), Some("legacy-sig"));
}

#[tokio::test]
async fn batch_create_decodes_partial_outcome() {
    let accepted_id = LocalId::new();
    let rejected_id = LocalId::new();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/occurrences/sync"))
        .and(body_partial_json(json!([
            { "localId": accepted_id.to_string(), "tipo": "traffic" },
            { "localId": rejected_id.to_string(), "tipo": "traffic" }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accepted": [ { "localId": accepted_id.to_string(), "_id": "65aaa111" } ],
            "rejected": [ { "localId": rejected_id.to_string(), "reason": "duplicate" } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client
        .batch_create(vec![(accepted_id, payload()), (rejected_id, payload())])
        .await
        .unwrap();

    assert_eq!(outcome.accepted, vec![(accepted_id, RemoteId::new("65aaa111"))]);
    assert_eq!(outcome.rejected, vec![(rejected_id, "duplicate".to_string())]);
}
