//! Checkout: order placement, attribution and confirmation mail.

use axum::http::StatusCode;
use serde_json::json;

use authentic_core::OrderId;

use authentic_integration_tests::{
    ADMIN_MAILBOX, TestApp, customer_order, guest_order, test_config,
};

#[tokio::test]
async fn test_guest_checkout_creates_pending_guest_order() {
    let app = TestApp::new();

    let order = app
        .place_order(guest_order("nusrat@example.com"), None)
        .await;

    assert!(order["user"].is_null());
    assert_eq!(order["guestInfo"]["email"], "nusrat@example.com");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["isDelivered"], false);
    assert!(order["deliveredAt"].is_null());
    assert!(order["_id"].is_string());
    assert!(order["createdAt"].is_string());
}

#[tokio::test]
async fn test_items_are_stored_exactly_as_submitted() {
    let app = TestApp::new();
    let body = guest_order("nusrat@example.com");

    let order = app.place_order(body.clone(), None).await;

    assert_eq!(order["orderItems"], body["orderItems"]);
    assert_eq!(order["totalPrice"], 1000);
    assert_eq!(order["shippingAddress"], body["shippingAddress"]);
}

#[tokio::test]
async fn test_empty_cart_is_rejected_and_nothing_stored() {
    let app = TestApp::new();
    let mut body = guest_order("nusrat@example.com");
    body["orderItems"] = json!([]);

    let response = app.post("/api/orders", body, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "No order items");
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_shipping_address_is_rejected() {
    let app = TestApp::new();
    let mut body = guest_order("nusrat@example.com");
    body.as_object_mut().unwrap().remove("shippingAddress");

    let response = app.post("/api/orders", body, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_a_json_400() {
    let app = TestApp::new();

    let response = app
        .post("/api/orders", json!({ "orderItems": "not a list" }), None)
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(!response.message().is_empty());
}

#[tokio::test]
async fn test_token_owner_wins_and_guest_info_is_kept() {
    let app = TestApp::new();
    let (customer, token) = app.customer("rina@example.com").await;

    let order = app
        .place_order(guest_order("someone-else@example.com"), Some(&token))
        .await;

    assert_eq!(order["user"], customer.id.to_string());
    assert_eq!(order["guestInfo"]["email"], "someone-else@example.com");

    let mail = app.sent_mail().await;
    let confirmation = mail
        .iter()
        .find(|m| m.subject.starts_with("Order Confirmation"))
        .unwrap();
    assert_eq!(confirmation.to.as_str(), "rina@example.com");
}

#[tokio::test]
async fn test_customer_order_without_guest_info() {
    let app = TestApp::new();
    let (customer, token) = app.customer("rina@example.com").await;

    let order = app.place_order(customer_order(), Some(&token)).await;

    assert_eq!(order["user"], customer.id.to_string());
    assert!(order.get("guestInfo").is_none());
}

#[tokio::test]
async fn test_customer_order_keeps_blank_guest_info() {
    let app = TestApp::new();
    let (customer, token) = app.customer("rina@example.com").await;
    let mut body = customer_order();
    body["guestInfo"] = json!({ "name": "", "email": "", "phone": "" });

    let order = app.place_order(body.clone(), Some(&token)).await;
    assert_eq!(order["user"], customer.id.to_string());
    assert_eq!(order["guestInfo"], body["guestInfo"]);

    let path = format!("/api/orders/{}", order["_id"].as_str().unwrap());
    let fetched = app.get(&path, Some(&token)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["guestInfo"], body["guestInfo"]);
}

#[tokio::test]
async fn test_invalid_token_falls_back_to_guest() {
    let app = TestApp::new();

    let order = app
        .place_order(guest_order("nusrat@example.com"), Some("not.a.token"))
        .await;

    assert!(order["user"].is_null());
    assert_eq!(order["guestInfo"]["email"], "nusrat@example.com");
}

#[tokio::test]
async fn test_no_owner_and_no_contact_is_rejected() {
    let app = TestApp::new();

    let response = app.post("/api/orders", customer_order(), None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Contact information is required");
}

#[tokio::test]
async fn test_guest_without_email_still_places_order_without_mail() {
    let app = TestApp::new();
    let mut body = guest_order("x@example.com");
    body["guestInfo"] = json!({ "name": "Walk-in", "phone": "01900000000" });

    app.place_order(body, None).await;

    assert!(app.sent_mail().await.is_empty());
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_confirmation_and_alert_are_sent() {
    let app = TestApp::new();

    let order = app
        .place_order(guest_order("nusrat@example.com"), None)
        .await;
    let mail = app.sent_mail().await;

    assert_eq!(mail.len(), 2);
    assert_eq!(mail[0].to.as_str(), "nusrat@example.com");
    assert!(mail[0].subject.starts_with("Order Confirmation - Order #"));
    assert!(mail[0].html.contains("Nusrat Jahan"));
    assert_eq!(mail[1].to.as_str(), ADMIN_MAILBOX);
    assert!(mail[1].subject.starts_with("New Order Alert - Order #"));
    assert!(mail[1].html.contains("http://localhost:5173/admin/orders"));

    let id: OrderId = order["_id"].as_str().unwrap().parse().unwrap();
    assert!(mail[0].subject.ends_with(&id.reference()));
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_checkout() {
    let app = TestApp::new();
    app.mail.fail_for("nusrat@example.com").await;

    let response = app
        .post("/api/orders", guest_order("nusrat@example.com"), None)
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let mail = app.sent_mail().await;
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to.as_str(), ADMIN_MAILBOX);
}

#[tokio::test]
async fn test_alert_skipped_without_admin_mailbox() {
    let mut config = test_config();
    config.admin_email = None;
    let app = TestApp::with_config(config);

    app.place_order(guest_order("nusrat@example.com"), None)
        .await;

    let mail = app.sent_mail().await;
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].to.as_str(), "nusrat@example.com");
}

#[tokio::test]
async fn test_enforced_total_rejects_mismatch() {
    let mut config = test_config();
    config.order_total_policy = authentic_api::config::TotalPolicy::Enforce;
    let app = TestApp::with_config(config);
    let mut body = guest_order("nusrat@example.com");
    body["totalPrice"] = json!(10);

    let response = app.post("/api/orders", body, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_trusted_total_is_stored_as_submitted() {
    let app = TestApp::new();
    let mut body = guest_order("nusrat@example.com");
    body["totalPrice"] = json!(900);

    let order = app.place_order(body, None).await;

    assert_eq!(order["totalPrice"], 900);
}

#[tokio::test]
async fn test_oversized_line_total_is_rejected_under_trust() {
    let app = TestApp::new();
    let mut body = guest_order("nusrat@example.com");
    body["orderItems"][0]["price"] = json!(9_000_000_000_u64);

    let response = app.post("/api/orders", body, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Order total is too large");
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unstorable_prices_are_rejected() {
    let app = TestApp::new();
    let cases = [
        ("/orderItems/0/price", json!(5e28)),
        ("/orderItems/0/price", json!(12.345)),
        ("/totalPrice", json!(12_345_678_901_u64)),
        ("/totalPrice", json!(999.999)),
    ];

    for (pointer, value) in cases {
        let mut body = guest_order("nusrat@example.com");
        *body.pointer_mut(pointer).unwrap() = value.clone();

        let response = app.post("/api/orders", body, None).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{pointer} = {value}");
    }
    assert_eq!(app.state.store().orders.count(None).await.unwrap(), 0);
}
