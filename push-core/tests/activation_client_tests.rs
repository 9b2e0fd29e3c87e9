use push_core::activation::{ActivationGateway, ActivationStatus, PowerAuthRestClient};
use push_core::config::PowerAuthConfig;
use push_core::PushError;
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PowerAuthRestClient {
    PowerAuthRestClient::new(&PowerAuthConfig {
        url: server.uri(),
        timeout_ms: 2_000,
        ..Default::default()
    })
    .unwrap()
}

// ── Activation status ───────────────────────────────────────────

#[tokio::test]
async fn activation_status_active() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .and(body_json(json!({ "requestObject": { "activationId": "act-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": {
                "activationId": "act-1",
                "activationStatus": "ACTIVE",
                "userId": "u1",
                "applicationId": 1
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client_for(&server)
        .get_activation_status("act-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.activation_id, "act-1");
    assert_eq!(info.status, ActivationStatus::Active);
    assert_eq!(info.user_id.as_deref(), Some("u1"));
    assert!(info.is_active());
}

#[tokio::test]
async fn activation_status_legacy_and_unknown_values() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .and(body_json(json!({ "requestObject": { "activationId": "act-otp" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": { "activationId": "act-otp", "activationStatus": "OTP_USED" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .and(body_json(json!({ "requestObject": { "activationId": "act-new" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": { "activationId": "act-new", "activationStatus": "SUSPENDED" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let otp = client.get_activation_status("act-otp").await.unwrap().unwrap();
    assert_eq!(otp.status, ActivationStatus::PendingCommit);
    assert_eq!(otp.user_id, None);

    let unknown = client.get_activation_status("act-new").await.unwrap().unwrap();
    assert_eq!(unknown.status, ActivationStatus::Unknown);
    assert!(!unknown.is_active());
}

#[tokio::test]
async fn activation_status_not_found_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let info = client_for(&server).get_activation_status("missing").await.unwrap();
    assert!(info.is_none());
}

#[tokio::test]
async fn activation_status_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "ERROR",
            "responseObject": { "code": "ERR_ACTIVATION", "message": "Activation is invalid" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).get_activation_status("bad").await.unwrap_err();
    match err {
        PushError::GatewayError { code, message } => {
            assert_eq!(code, "ERR_ACTIVATION");
            assert_eq!(message, "Activation is invalid");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn activation_status_server_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_activation_status("act-1").await.unwrap_err();
    assert!(matches!(err, PushError::GatewayUnavailable(_)));
}

#[tokio::test]
async fn activation_status_timeout_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "OK" }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = PowerAuthRestClient::new(&PowerAuthConfig {
        url: server.uri(),
        timeout_ms: 50,
        ..Default::default()
    })
    .unwrap();

    let err = client.get_activation_status("act-1").await.unwrap_err();
    assert!(matches!(err, PushError::GatewayUnavailable(_)));
}

#[tokio::test]
async fn basic_auth_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/status"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": { "activationId": "act-1", "activationStatus": "BLOCKED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PowerAuthRestClient::new(&PowerAuthConfig {
        url: format!("{}/", server.uri()),
        username: Some("push".to_string()),
        password: Some("secret".to_string()),
        timeout_ms: 2_000,
    })
    .unwrap();

    let info = client.get_activation_status("act-1").await.unwrap().unwrap();
    assert_eq!(info.status, ActivationStatus::Blocked);
}

// ── Encryption key ──────────────────────────────────────────────

#[tokio::test]
async fn encryption_key_generated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/encryption/key/create"))
        .and(body_json(json!({
            "requestObject": { "activationId": "act-1", "sessionIndex": null }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": {
                "activationId": "act-1",
                "encryptionKey": "k1",
                "encryptionKeyIndex": "5"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let key = client_for(&server)
        .generate_encryption_key("act-1", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(key.encryption_key, "k1");
    assert_eq!(key.encryption_key_index, "5");
}

#[tokio::test]
async fn encryption_key_empty_response_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v3/activation/encryption/key/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "responseObject": null
        })))
        .mount(&server)
        .await;

    let key = client_for(&server)
        .generate_encryption_key("act-1", Some("3"))
        .await
        .unwrap();
    assert!(key.is_none());
}
