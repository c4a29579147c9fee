//! Order status changes and order reads.

use axum::http::StatusCode;
use serde_json::{Value, json};

use authentic_integration_tests::{TestApp, customer_order, guest_order};

async fn pending_order(app: &TestApp) -> String {
    let order = app
        .place_order(guest_order("nusrat@example.com"), None)
        .await;
    order["_id"].as_str().unwrap().to_string()
}

async fn set_status(app: &TestApp, id: &str, status: Value, token: &str) -> (StatusCode, Value) {
    let response = app
        .put(
            &format!("/api/admin/orders/{id}/status"),
            json!({ "status": status }),
            Some(token),
        )
        .await;
    (response.status, response.body)
}

#[tokio::test]
async fn test_delivered_stamps_delivery() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    let (status, order) = set_status(&app, &id, json!("delivered"), &admin).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["isDelivered"], true);
    assert!(order["deliveredAt"].is_string());
    assert_eq!(order["isPaid"], false);
}

#[tokio::test]
async fn test_cancel_then_admin_fetch_reflects_update() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    let (status, order) = set_status(&app, &id, json!("cancelled"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "cancelled");
    assert_eq!(order["isDelivered"], false);
    assert!(order["deliveredAt"].is_null());

    let fetched = app.get(&format!("/api/orders/{id}"), Some(&admin)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["status"], "cancelled");
    assert!(fetched.body["deliveredAt"].is_null());
}

#[tokio::test]
async fn test_pending_to_pending_keeps_delivery_cleared() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    let (status, order) = set_status(&app, &id, json!("pending"), &admin).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["isDelivered"], false);
    assert!(order["deliveredAt"].is_null());
}

#[tokio::test]
async fn test_repeated_transition_is_idempotent() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    let (first_status, first) = set_status(&app, &id, json!("delivered"), &admin).await;
    let (second_status, second) = set_status(&app, &id, json!("delivered"), &admin).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["status"], second["status"]);
    assert_eq!(first["deliveredAt"], second["deliveredAt"]);
}

#[tokio::test]
async fn test_invalid_status_is_rejected_and_order_untouched() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    for bad in [json!("shipped"), json!(""), json!(3), Value::Null] {
        let (status, body) = set_status(&app, &id, bad.clone(), &admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert!(body["message"].is_string());
    }

    let fetched = app.get(&format!("/api/orders/{id}"), Some(&admin)).await;
    assert_eq!(fetched.body["status"], "pending");
}

#[tokio::test]
async fn test_leaving_a_terminal_status_is_a_conflict() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;
    set_status(&app, &id, json!("cancelled"), &admin).await;

    let (status, _) = set_status(&app, &id, json!("delivered"), &admin).await;

    assert_eq!(status, StatusCode::CONFLICT);
    let fetched = app.get(&format!("/api/orders/{id}"), Some(&admin)).await;
    assert_eq!(fetched.body["status"], "cancelled");
}

#[tokio::test]
async fn test_status_change_on_unknown_order_is_404() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;

    let (status, _) = set_status(
        &app,
        "5f0c2a5e-2b1d-4c8e-9f3a-7d6e5c4b3a21",
        json!("delivered"),
        &admin,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = set_status(&app, "not-an-id", json!("delivered"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_change_requires_admin() {
    let app = TestApp::new();
    let (_, customer) = app.customer("rina@example.com").await;
    let id = pending_order(&app).await;

    let (status, body) = set_status(&app, &id, json!("delivered"), &customer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin access required");

    let response = app
        .put(
            &format!("/api/admin/orders/{id}/status"),
            json!({ "status": "delivered" }),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pending_count() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    for _ in 0..3 {
        pending_order(&app).await;
    }
    let delivered = pending_order(&app).await;
    set_status(&app, &delivered, json!("delivered"), &admin).await;

    let response = app
        .get("/api/admin/orders/pending/count", Some(&admin))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "count": 3 }));
}

#[tokio::test]
async fn test_my_orders_lists_only_own_orders_newest_first() {
    let app = TestApp::new();
    let (_, rina) = app.customer("rina@example.com").await;
    let (_, other) = app.customer("karim@example.com").await;

    let first = app.place_order(customer_order(), Some(&rina)).await;
    let second = app.place_order(customer_order(), Some(&rina)).await;
    app.place_order(customer_order(), Some(&other)).await;
    app.place_order(guest_order("rina@example.com"), None).await;

    let response = app.get("/api/orders/myorders", Some(&rina)).await;

    assert_eq!(response.status, StatusCode::OK);
    let orders = response.body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["_id"], second["_id"]);
    assert_eq!(orders[1]["_id"], first["_id"]);
}

#[tokio::test]
async fn test_my_orders_requires_token() {
    let app = TestApp::new();

    let response = app.get("/api/orders/myorders", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "Authentication required");
}

#[tokio::test]
async fn test_owner_can_read_order_with_owner_populated() {
    let app = TestApp::new();
    let (rina, token) = app.customer("rina@example.com").await;
    let order = app.place_order(customer_order(), Some(&token)).await;
    let id = order["_id"].as_str().unwrap();

    let response = app.get(&format!("/api/orders/{id}"), Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["user"]["_id"], rina.id.to_string());
    assert_eq!(response.body["user"]["email"], "rina@example.com");
}

#[tokio::test]
async fn test_other_customer_cannot_read_order() {
    let app = TestApp::new();
    let (_, rina) = app.customer("rina@example.com").await;
    let (_, karim) = app.customer("karim@example.com").await;
    let order = app.place_order(customer_order(), Some(&rina)).await;
    let id = order["_id"].as_str().unwrap();

    let response = app.get(&format!("/api/orders/{id}"), Some(&karim)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guest_orders_are_admin_only() {
    let app = TestApp::new();
    let (_, customer) = app.customer("nusrat@example.com").await;
    let (_, admin) = app.admin().await;
    let id = pending_order(&app).await;

    let as_customer = app.get(&format!("/api/orders/{id}"), Some(&customer)).await;
    assert_eq!(as_customer.status, StatusCode::UNAUTHORIZED);

    let as_admin = app.get(&format!("/api/orders/{id}"), Some(&admin)).await;
    assert_eq!(as_admin.status, StatusCode::OK);
    assert!(as_admin.body["user"].is_null());
}

#[tokio::test]
async fn test_unknown_order_is_404() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;

    let missing = app
        .get("/api/orders/5f0c2a5e-2b1d-4c8e-9f3a-7d6e5c4b3a21", Some(&admin))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Order not found");

    let malformed = app.get("/api/orders/abc", Some(&admin)).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}
