//! Catalog reads and admin product management.

use axum::http::StatusCode;
use serde_json::{Value, json};

use authentic_api::db::seed::{default_catalog, seed_catalog};
use authentic_integration_tests::TestApp;

async fn seeded() -> TestApp {
    let app = TestApp::new();
    seed_catalog(app.state.store(), default_catalog())
        .await
        .unwrap();
    app
}

fn new_product() -> Value {
    json!({
        "name": "Mint Chikankari Co-ord Set",
        "category": "Co-ord Set",
        "price": 4800,
        "image": "https://img.example/coord.jpg",
        "description": "Hand-embroidered cotton co-ord set."
    })
}

#[tokio::test]
async fn test_list_and_filter_products() {
    let app = seeded().await;

    let all = app.get("/api/products", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body.as_array().unwrap().len(), 5);

    let kameez = app.get("/api/products?category=kameez", None).await;
    assert_eq!(kameez.body.as_array().unwrap().len(), 3);

    let featured = app.get("/api/products?featured=true", None).await;
    let featured = featured.body.as_array().unwrap();
    assert_eq!(featured.len(), 3);
    assert!(featured.iter().all(|p| p["isFeatured"] == true));
}

#[tokio::test]
async fn test_show_product_and_missing_product() {
    let app = seeded().await;
    let all = app.get("/api/products", None).await;
    let id = all.body[0]["_id"].as_str().unwrap().to_string();

    let found = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["_id"], id);

    let missing = app
        .get("/api/products/5f0c2a5e-2b1d-4c8e-9f3a-7d6e5c4b3a21", None)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Product not found");

    let malformed = app.get("/api/products/not-an-id", None).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_creates_product_with_defaults() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;

    let response = app.post("/api/products", new_product(), Some(&admin)).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["countInStock"], 0);
    assert_eq!(response.body["isFeatured"], false);
    assert_eq!(response.body["price"], 4800);
}

#[tokio::test]
async fn test_product_validation() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;

    let mut nameless = new_product();
    nameless["name"] = json!(" ");
    let response = app.post("/api/products", nameless, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.message(), "Name is required");

    let mut negative = new_product();
    negative["price"] = json!(-5);
    let response = app.post("/api/products", negative, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_writes_require_admin() {
    let app = seeded().await;
    let (_, customer) = app.customer("rina@example.com").await;

    let anonymous = app.post("/api/products", new_product(), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let as_customer = app
        .post("/api/products", new_product(), Some(&customer))
        .await;
    assert_eq!(as_customer.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_and_delete_product() {
    let app = TestApp::new();
    let (_, admin) = app.admin().await;
    let created = app.post("/api/products", new_product(), Some(&admin)).await;
    let id = created.body["_id"].as_str().unwrap().to_string();

    let updated = app
        .put(
            &format!("/api/products/{id}"),
            json!({ "price": 4500, "countInStock": 7, "isFeatured": true }),
            Some(&admin),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["price"], 4500);
    assert_eq!(updated.body["countInStock"], 7);
    assert_eq!(updated.body["name"], "Mint Chikankari Co-ord Set");

    let deleted = app
        .delete(&format!("/api/products/{id}"), Some(&admin))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.message(), "Product deleted successfully");

    let again = app
        .delete(&format!("/api/products/{id}"), Some(&admin))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}
