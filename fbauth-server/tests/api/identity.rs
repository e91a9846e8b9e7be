use chrono::{Duration, Utc};
use serde_json::json;

use crate::TestApp;

fn unsigned_token(claims: serde_json::Value) -> String {
    let header = base64::encode_config(br#"{"alg":"none","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD);
    let payload = base64::encode_config(claims.to_string(), base64::URL_SAFE_NO_PAD);
    format!("{}.{}.", header, payload)
}

fn claims(issued_at: i64, expires_at: i64) -> serde_json::Value {
    json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": "emulated-uid",
        "iat": issued_at,
        "exp": expires_at,
        "email": "emulated@example.com",
        "email_verified": false,
        "claims": {"role": "member"}
    })
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn missing_token_is_unauthorized() {
    let app = TestApp::start().await.expect("failed to start test server");

    let response = app.get("/api/v1/identity", None).await.unwrap();

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        Some("Bearer"),
        response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok())
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!("unauthorized", body["message"]);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn owner_token_resolves_owner_identity() {
    let app = TestApp::start().await.expect("failed to start test server");

    let (status, identity) = app.identity(Some("owner")).await.unwrap();

    assert_eq!(200, status.as_u16());
    let identity = identity.unwrap();
    assert_eq!("owner", identity.uid);
    assert_eq!(Some("owner@example.com"), identity.email.as_deref());
    assert_eq!(Some(true), identity.email_verified);
    assert_eq!(Some("true"), identity.claim("admin"));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn emulator_token_resolves_identity() {
    let app = TestApp::start().await.expect("failed to start test server");
    let now = Utc::now();
    let token = unsigned_token(claims(
        (now - Duration::minutes(1)).timestamp(),
        (now + Duration::hours(1)).timestamp(),
    ));

    let (status, identity) = app.identity(Some(&token)).await.unwrap();

    assert_eq!(200, status.as_u16());
    let identity = identity.unwrap();
    assert_eq!("emulated-uid", identity.uid);
    assert_eq!(Some(false), identity.email_verified);
    assert_eq!(Some("member"), identity.claim("role"));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn expired_and_garbled_tokens_are_unauthorized() {
    let app = TestApp::start().await.expect("failed to start test server");
    let now = Utc::now();
    let expired = unsigned_token(claims(
        (now - Duration::hours(2)).timestamp(),
        (now - Duration::hours(1)).timestamp(),
    ));

    for token in [expired.as_str(), "garbled", "a.b.c"] {
        let (status, identity) = app.identity(Some(token)).await.unwrap();
        assert_eq!(401, status.as_u16(), "{}", token);
        assert!(identity.is_none());
    }
}
