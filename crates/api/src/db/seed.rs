//! Idempotent seeding: default catalog and bootstrap admin account.
//!
//! Run at server startup and by `authentic-cli seed`. Both steps are safe to
//! repeat: products are only inserted into an empty catalog, and the admin
//! account is created once and afterwards only promoted.

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use authentic_core::{Price, UserRole};

use super::{RepositoryError, Store};
use crate::config::SeedAdminConfig;
use crate::models::{NewUser, ProductDraft};
use crate::services::auth::{AuthError, hash_password};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("invalid product {name}: {reason}")]
    InvalidProduct { name: String, reason: String },

    #[error("password hashing failed: {0}")]
    Auth(#[from] AuthError),
}

/// A catalog file: a list of product drafts.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub products: Vec<ProductDraft>,
}

/// What the catalog seeding step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOutcome {
    Inserted(usize),
    AlreadyPopulated(i64),
}

/// What the admin seeding step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Created,
    Promoted,
    AlreadyAdmin,
}

fn draft(
    name: &str,
    category: &str,
    taka: u32,
    image: &str,
    description: &str,
    is_featured: bool,
) -> ProductDraft {
    ProductDraft {
        name: name.to_owned(),
        category: category.to_owned(),
        price: Some(Price::from_taka(taka)),
        image: image.to_owned(),
        description: Some(description.to_owned()),
        count_in_stock: 0,
        is_featured,
    }
}

/// The launch catalog.
#[must_use]
pub fn default_catalog() -> Vec<ProductDraft> {
    vec![
        draft(
            "Emerald Green Kameez Set",
            "Kameez",
            3500,
            "https://images.unsplash.com/photo-1583391733958-37c265a6e279?auto=format&fit=crop&q=80&w=1000",
            "Elegant emerald green kameez with intricate gold embroidery. Perfect for festive occasions.",
            true,
        ),
        draft(
            "Classic Red Banarasi Saree",
            "Saree",
            12000,
            "https://images.unsplash.com/photo-1610030469983-98e550d6193c?auto=format&fit=crop&q=80&w=1000",
            "Traditional red Banarasi saree with wide golden borders. A timeless masterpiece.",
            true,
        ),
        draft(
            "Batik Print Silk Fabric",
            "Fabric",
            1200,
            "https://images.unsplash.com/photo-1596483738096-787be09c95d9?auto=format&fit=crop&q=80&w=1000",
            "Premium silk fabric with artistic batik prints. Suitable for custom tailoring.",
            false,
        ),
        draft(
            "Royal Blue Georgette Suit",
            "Kameez",
            4200,
            "https://images.unsplash.com/photo-1585487000160-6ebcfceb0d03?auto=format&fit=crop&q=80&w=1000",
            "Flowy georgette suit in royal blue, adorned with stone work.",
            true,
        ),
        draft(
            "Pink Cotton Salwar Kameez",
            "Kameez",
            2500,
            "https://images.unsplash.com/photo-1631233859262-0d625cf0264b?auto=format&fit=crop&q=80&w=800",
            "Comfortable pink cotton salwar kameez for daily wear.",
            false,
        ),
    ]
}

/// Insert `drafts` if the catalog is empty.
///
/// # Errors
///
/// Returns `SeedError::InvalidProduct` for an incomplete draft (nothing is
/// inserted in that case) and `SeedError::Repository` on storage failure.
pub async fn seed_catalog(
    store: &Store,
    drafts: Vec<ProductDraft>,
) -> Result<CatalogOutcome, SeedError> {
    let existing = store.products.count().await?;
    if existing > 0 {
        info!(count = existing, "Catalog already populated");
        return Ok(CatalogOutcome::AlreadyPopulated(existing));
    }

    let now = Utc::now();
    let products = drafts
        .into_iter()
        .map(|d| {
            let name = d.name.clone();
            d.into_product(now)
                .map_err(|reason| SeedError::InvalidProduct { name, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for product in &products {
        store.products.insert(product).await?;
    }

    info!(count = products.len(), "Catalog seeded");
    Ok(CatalogOutcome::Inserted(products.len()))
}

/// Make sure the bootstrap admin exists and holds the admin role.
///
/// # Errors
///
/// Returns `SeedError` on storage or hashing failure.
pub async fn ensure_admin(
    store: &Store,
    admin: &SeedAdminConfig,
) -> Result<AdminOutcome, SeedError> {
    if let Some(user) = store.users.get_by_email(&admin.email).await? {
        if user.is_admin() {
            info!(email = %admin.email, "Bootstrap admin already present");
            return Ok(AdminOutcome::AlreadyAdmin);
        }
        store.users.set_role(&admin.email, UserRole::Admin).await?;
        info!(email = %admin.email, "Promoted bootstrap account to admin");
        return Ok(AdminOutcome::Promoted);
    }

    let password_hash = hash_password(admin.password.expose_secret())?;
    store
        .users
        .create(NewUser {
            name: admin.name.clone(),
            email: admin.email.clone(),
            password_hash,
            role: UserRole::Admin,
            phone: None,
            google_id: None,
            image: None,
        })
        .await?;
    info!(email = %admin.email, "Bootstrap admin created");
    Ok(AdminOutcome::Created)
}

/// Startup seeding. Failures are logged, never fatal.
pub async fn run_startup_seed(store: &Store, admin: Option<&SeedAdminConfig>) {
    if let Err(e) = seed_catalog(store, default_catalog()).await {
        warn!(error = %e, "Catalog seeding failed");
    }
    if let Some(admin) = admin
        && let Err(e) = ensure_admin(store, admin).await
    {
        warn!(error = %e, "Admin seeding failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use authentic_core::Email;
    use secrecy::SecretString;

    use super::*;
    use crate::models::ProductFilter;

    fn admin_config() -> SeedAdminConfig {
        SeedAdminConfig {
            email: Email::parse("owner@authentic-ctg.com").unwrap(),
            name: "Shop Owner".to_owned(),
            password: SecretString::from("k8#Vd2!qLz"),
        }
    }

    #[tokio::test]
    async fn test_catalog_seeds_once() {
        let store = Store::in_memory();
        assert_eq!(
            seed_catalog(&store, default_catalog()).await.unwrap(),
            CatalogOutcome::Inserted(5)
        );
        assert_eq!(
            seed_catalog(&store, default_catalog()).await.unwrap(),
            CatalogOutcome::AlreadyPopulated(5)
        );

        let featured = ProductFilter {
            category: None,
            featured: Some(true),
        };
        assert_eq!(store.products.list(&featured).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_catalog_inserts_nothing() {
        let store = Store::in_memory();
        let mut drafts = default_catalog();
        drafts.push(ProductDraft {
            name: "Nameless".to_owned(),
            category: String::new(),
            price: Some(Price::from_taka(1)),
            image: "x.jpg".to_owned(),
            description: None,
            count_in_stock: 0,
            is_featured: false,
        });
        let result = seed_catalog(&store, drafts).await;
        assert!(matches!(result, Err(SeedError::InvalidProduct { .. })));
        assert_eq!(store.products.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_admin_created_then_kept() {
        let store = Store::in_memory();
        let config = admin_config();
        assert_eq!(
            ensure_admin(&store, &config).await.unwrap(),
            AdminOutcome::Created
        );
        assert_eq!(
            ensure_admin(&store, &config).await.unwrap(),
            AdminOutcome::AlreadyAdmin
        );
    }

    #[tokio::test]
    async fn test_existing_customer_promoted() {
        let store = Store::in_memory();
        let config = admin_config();
        store
            .users
            .create(NewUser {
                name: "Owner".to_owned(),
                email: config.email.clone(),
                password_hash: "hash".to_owned(),
                role: UserRole::Customer,
                phone: None,
                google_id: None,
                image: None,
            })
            .await
            .unwrap();

        assert_eq!(
            ensure_admin(&store, &config).await.unwrap(),
            AdminOutcome::Promoted
        );
        let user = store.users.get_by_email(&config.email).await.unwrap().unwrap();
        assert!(user.is_admin());
    }
}
