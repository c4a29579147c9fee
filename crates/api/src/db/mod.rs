//! Persistence for users, products and orders.
//!
//! # Tables
//!
//! - `users` - Accounts (password hash, role, optional Google link)
//! - `products` - Catalog
//! - `orders` - Placed orders; item snapshots and addresses as JSONB
//!
//! # Backends
//!
//! Handlers only see the repository traits below, bundled in [`Store`].
//! [`Store::postgres`] is used in production; [`Store::in_memory`] backs the
//! integration tests and local experiments.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p authentic-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod seed;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use authentic_core::{Email, Fulfillment, OrderId, OrderStatus, ProductId, UserId, UserRole};

use crate::models::{NewUser, Order, Product, ProductFilter, User};

pub use memory::{InMemoryOrders, InMemoryProducts, InMemoryUsers};
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

/// Embedded migrations for the API schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or a lost update race.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to `Conflict`, everything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }
}

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get several users at once (missing ids are skipped).
    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError>;

    /// Get a user by email (case-insensitive).
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Get a user by linked Google account id.
    async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user.
    ///
    /// Fails with `Conflict` if the email or Google id is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    /// Attach a Google account (and picture) to an existing user.
    async fn link_google(
        &self,
        id: UserId,
        google_id: &str,
        image: Option<&str>,
    ) -> Result<User, RepositoryError>;

    /// Change a user's role. Returns `None` if no account has that email.
    async fn set_role(&self, email: &Email, role: UserRole)
    -> Result<Option<User>, RepositoryError>;

    /// List accounts holding `role`, oldest first.
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError>;

    /// Delete every account holding `role`. Returns the number deleted.
    async fn delete_by_role(&self, role: UserRole) -> Result<u64, RepositoryError>;

    /// Count accounts holding `role`.
    async fn count_by_role(&self, role: UserRole) -> Result<i64, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List products matching `filter`, oldest first.
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Get a product by ID.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a new product.
    async fn insert(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Overwrite an existing product. Fails with `NotFound` if it is gone.
    async fn update(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Delete a product. Returns `false` if it did not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Count all products.
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a freshly placed order.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Get an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// All orders, newest first, optionally restricted to one status.
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError>;

    /// Orders attributed to `user`, newest first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Count orders, optionally restricted to one status.
    async fn count(&self, status: Option<OrderStatus>) -> Result<i64, RepositoryError>;

    /// Write a new fulfillment state if the order is still in `expected`.
    ///
    /// Fails with `NotFound` if the order is gone and `Conflict` if its
    /// status changed in the meantime.
    async fn update_fulfillment(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: Fulfillment,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError>;
}

/// The repositories the application runs against.
///
/// Cheap to clone. Owns the connection pool when backed by Postgres so the
/// pool can be closed explicitly on shutdown.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pool: Option<PgPool>,
}

impl Store {
    /// Postgres-backed store.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Process-local store that forgets everything on drop.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUsers::default()),
            products: Arc::new(InMemoryProducts::default()),
            orders: Arc::new(InMemoryOrders::default()),
            pool: None,
        }
    }

    /// Check the backing database answers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the ping query fails.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }

    /// Close the connection pool, waiting for checked-out connections.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
