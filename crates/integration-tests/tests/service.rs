//! Health checks and cross-cutting middleware.

use axum::http::StatusCode;

use authentic_integration_tests::TestApp;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_response_has_request_id() {
    let app = TestApp::new();

    let response = app.get("/api/products", None).await;
    assert!(response.headers.contains_key("x-request-id"));

    let error = app.get("/api/orders/myorders", None).await;
    assert!(error.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new();

    let response = app.get("/api/seed", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
