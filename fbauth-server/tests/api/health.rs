use crate::TestApp;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn health_check_needs_no_token() {
    let app = TestApp::start().await.expect("failed to start test server");

    let response = app
        .get("/health", None)
        .await
        .expect("failed to perform health check");

    assert_eq!(200, response.status().as_u16());
    assert_eq!("UP", response.text().await.unwrap());
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
pub async fn unknown_route_is_not_found() {
    let app = TestApp::start().await.expect("failed to start test server");

    let response = app.get("/nope", None).await.unwrap();

    assert_eq!(404, response.status().as_u16());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!("failure", body["result"]);
}
