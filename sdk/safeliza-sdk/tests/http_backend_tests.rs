use std::time::Duration;

use safeliza_sdk::core::constants::*;
use safeliza_sdk::types::{EncodedSignature, LoginRequest};
use safeliza_sdk::{
    compile, Assertion, ClientConfig, HttpBackend, SafelizaSdkError, SessionBackend,
};
use safeliza_state::{
    AccountRef, OperationHash, PolicyConfig, SessionConfigDto, SessionCreationReceipt,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SAFE: &str = "0x1111111111111111111111111111111111111111";

fn account() -> AccountRef {
    AccountRef::new(SAFE.parse().unwrap(), 8453)
}

fn hash() -> OperationHash {
    format!("0x{}", "cd".repeat(32)).parse().unwrap()
}

fn backend(server: &MockServer) -> HttpBackend {
    let config = ClientConfig::new(format!("{}/", server.uri()))
        .with_request_timeout(Duration::from_secs(5));
    HttpBackend::new(config).unwrap()
}

//=============================================================================
// Request shape
//=============================================================================

#[tokio::test]
async fn configure_posts_camel_case_body() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let mut config = PolicyConfig::default();
    config.sudo.active = true;
    let dto = SessionConfigDto::from(compile(&config));

    Mock::given(method("POST"))
        .and(path(CONFIGURE_SMART_SESSION_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "safeAddress": SAFE,
            "chainId": 8453,
            "sessionConfigDto": serde_json::to_value(&dto)?,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hash": hash().to_string(),
            "passkeyId": "cred-1",
            "ignored": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let configured = backend(&server)
        .configure_smart_session(&account(), &dto)
        .await?;
    assert_eq!(configured.hash, hash());
    assert_eq!(configured.passkey_id, "cred-1");
    Ok(())
}

#[tokio::test]
async fn session_details_is_a_get_on_account_path() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}/8453", SESSION_DETAILS_PATH, SAFE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sessionKey": "0xkey",
            "permissionEnableHash": "0xenable",
            "permissionId": "perm-1",
            "sessionDetails": "{\"permissionId\":\"perm-1\"}",
            "endpoint": { "active": true, "url": "/agent/perm-1" }
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let records = backend(&server).session_details(&account()).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].permission_id, "perm-1");
    assert!(records[0].endpoint.active);
    assert_eq!(records[0].parsed_details()?["permissionId"], "perm-1");
    Ok(())
}

#[tokio::test]
async fn execute_user_operation_sends_hash_and_signature() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let signature = EncodedSignature::from_bytes(&[0xab, 0xcd]);

    Mock::given(method("POST"))
        .and(path(EXECUTE_USER_OPERATION_PATH))
        .and(body_json(json!({
            "encodedSignature": "0xabcd",
            "userOpHashToSign": hash().to_string(),
            "safeAddress": SAFE,
            "chainId": 8453,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactionHash": "0xfeed",
            "userOpHash": hash().to_string(),
            "success": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = backend(&server)
        .execute_signed_user_operation(&account(), &hash(), &signature)
        .await?;
    assert!(receipt.success);
    assert_eq!(receipt.transaction_hash, "0xfeed");
    Ok(())
}

#[tokio::test]
async fn activate_endpoint_sends_path_and_flag() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ACTIVATE_ENDPOINT_PATH))
        .and(body_json(json!({
            "path": "/agent/perm-1",
            "safeAddress": SAFE,
            "chainId": 8453,
            "active": false,
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .activate_endpoint(&account(), "/agent/perm-1", false)
        .await?;
    Ok(())
}

#[tokio::test]
async fn login_cookie_is_sent_on_later_requests() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PASSKEY_VERIFY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=s3ss10n; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}/8453", SESSION_DETAILS_PATH, SAFE)))
        .and(header("cookie", "sid=s3ss10n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let assertion = Assertion {
        credential_id: "cred-1".into(),
        client_data_json: b"{}".to_vec(),
        authenticator_data: vec![0; 37],
        signature: vec![0x30, 0x00],
        user_handle: None,
    };
    backend.verify_login(&LoginRequest::from(&assertion)).await?;

    let records = backend.session_details(&account()).await?;
    assert!(records.is_empty());
    Ok(())
}

//=============================================================================
// Response handling
//=============================================================================

#[tokio::test]
async fn empty_sign_creation_body_is_default_receipt() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SIGN_SESSION_CREATION_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let receipt = backend(&server)
        .sign_session_creation(&account(), &hash(), &EncodedSignature::from_bytes(&[1]))
        .await?;
    assert_eq!(receipt, SessionCreationReceipt::default());
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_backend_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSTALLED_MODULES_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("not your safe"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .installed_modules(&account())
        .await
        .unwrap_err();
    match err {
        SafelizaSdkError::BackendRejection { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "not your safe");
        },
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn undecodable_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = backend(&server).current_user().await.unwrap_err();
    assert!(matches!(err, SafelizaSdkError::InvalidResponse(_)));
    assert!(err.is_backend());
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(ClientConfig::new(format!("http://{}", addr))).unwrap();
    let err = backend.logout().await.unwrap_err();
    assert!(matches!(err, SafelizaSdkError::Network(_)));
}
