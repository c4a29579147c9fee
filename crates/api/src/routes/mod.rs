//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (store ping)
//!
//! # Auth
//! POST /api/auth/register               - Create account, returns token
//! POST /api/auth/login                  - Sign in, returns token
//! GET  /api/auth/me                     - Current account (auth)
//! GET  /api/auth/google                 - Redirect to Google consent
//! GET  /api/auth/google/callback        - Finish Google sign-in
//!
//! # Products
//! GET    /api/products                  - List (?category=, ?featured=)
//! GET    /api/products/{id}             - Detail
//! POST   /api/products                  - Create (admin)
//! PUT    /api/products/{id}             - Update (admin)
//! DELETE /api/products/{id}             - Delete (admin)
//!
//! # Orders
//! POST /api/orders                      - Checkout (guest or customer)
//! GET  /api/orders/myorders             - Caller's orders (auth)
//! GET  /api/orders/{id}                 - One order (owner or admin)
//!
//! # Admin
//! GET /api/admin/stats                  - Dashboard counters
//! GET /api/admin/orders                 - All orders (?status=)
//! GET /api/admin/orders/pending/count   - Pending badge count
//! PUT /api/admin/orders/{id}/status     - Change order status
//! ```

pub mod admin;
pub mod auth;
pub mod google;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Register and login are rate limited per client IP when `rate_limit` is set.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let mut credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));
    if rate_limit {
        credentials = credentials.layer(auth_rate_limiter());
    }

    Router::new()
        .merge(credentials)
        .route("/me", get(auth::me))
        .route("/google", get(google::login))
        .route("/google/callback", get(google::callback))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create))
        .route("/myorders", get(orders::mine))
        .route("/{id}", get(orders::show))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/orders", get(admin::orders))
        .route("/orders/pending/count", get(admin::pending_count))
        .route("/orders/{id}/status", put(admin::update_status))
}

/// Create all routes.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes(rate_limit))
        .nest("/api/products", product_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/admin", admin_routes())
}
