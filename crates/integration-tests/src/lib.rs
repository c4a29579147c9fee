//! Integration tests for the Authentic API.
//!
//! Tests drive the real router in-process with `tower::ServiceExt::oneshot`,
//! backed by the in-memory store and a recording mail transport, so no
//! database or SMTP relay is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p authentic-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use authentic_api::config::{ApiConfig, TotalPolicy};
use authentic_api::db::Store;
use authentic_api::models::{NewUser, User};
use authentic_api::services::auth::hash_password;
use authentic_api::services::notifications::{OutgoingMail, RecordingTransport};
use authentic_api::state::AppState;
use authentic_core::{Email, UserRole};

/// Mailbox that receives new-order alerts in tests.
pub const ADMIN_MAILBOX: &str = "orders@authentic-ctg.com";

/// Password used for accounts created by the harness.
pub const PASSWORD: &str = "kameez-2024";

/// Configuration with mail alerts on, rate limiting and Google off.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        jwt_secret: SecretString::from("t3st-s1gning-k3y-9f8e7d6c5b4a3210fedcba98"),
        client_url: "http://localhost:5173".to_string(),
        base_url: "http://localhost:5000".to_string(),
        admin_email: Some(Email::parse(ADMIN_MAILBOX).unwrap()),
        order_total_policy: TotalPolicy::Trust,
        rate_limit: false,
        email: None,
        google: None,
        seed_admin: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A response decoded for assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    /// JSON body, a JSON string for text bodies, or `null` when empty.
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of an error body.
    #[must_use]
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// The API wired to in-memory storage.
pub struct TestApp {
    pub state: AppState,
    pub mail: RecordingTransport,
    router: Router,
}

impl TestApp {
    /// Start an app with [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Start an app with a custom configuration.
    pub fn with_config(config: ApiConfig) -> Self {
        let mail = RecordingTransport::new();
        let state = AppState::new(config, Store::in_memory(), Arc::new(mail.clone()));
        let router = authentic_api::app(state.clone());
        Self {
            state,
            mail,
            router,
        }
    }

    /// Send a request, optionally with a JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn put(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    /// Insert an account directly and return it with a fresh token.
    pub async fn create_user(&self, name: &str, email: &str, role: UserRole) -> (User, String) {
        let user = self
            .state
            .store()
            .users
            .create(NewUser {
                name: name.to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role,
                phone: Some("01711000000".to_string()),
                google_id: None,
                image: None,
            })
            .await
            .unwrap();
        let session = self.state.auth().session(user).unwrap();
        (session.user, session.token)
    }

    /// An admin account and its token.
    pub async fn admin(&self) -> (User, String) {
        self.create_user("Shop Owner", "owner@authentic-ctg.com", UserRole::Admin)
            .await
    }

    /// A customer account and its token.
    pub async fn customer(&self, email: &str) -> (User, String) {
        self.create_user("Rina Akter", email, UserRole::Customer)
            .await
    }

    /// Place an order and return the response body.
    pub async fn place_order(&self, body: Value, token: Option<&str>) -> Value {
        let response = self.post("/api/orders", body, token).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Wait for queued mail to be sent, then return everything sent so far.
    pub async fn sent_mail(&self) -> Vec<OutgoingMail> {
        self.state.notifier().flush().await;
        self.mail.sent().await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkout body from the guest scenario: two sarees at 500 each.
#[must_use]
pub fn guest_order(email: &str) -> Value {
    json!({
        "orderItems": [{
            "name": "Saree",
            "qty": 2,
            "image": "https://img.example/saree.jpg",
            "price": 500,
            "product": "0b7c5a1e-8d2f-4e4b-9a61-3f2d1c0e9a7b"
        }],
        "guestInfo": { "name": "Nusrat Jahan", "email": email, "phone": "01800000000" },
        "shippingAddress": {
            "address": "12 Jamal Khan Road",
            "city": "Chittagong",
            "postalCode": "4000",
            "country": "Bangladesh"
        },
        "paymentMethod": "Cash on Delivery",
        "totalPrice": 1000
    })
}

/// Checkout body without guest contact details.
#[must_use]
pub fn customer_order() -> Value {
    let mut body = guest_order("unused@example.com");
    body.as_object_mut().unwrap().remove("guestInfo");
    body
}
