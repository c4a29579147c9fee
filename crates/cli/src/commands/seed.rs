//! Seed the catalog and the bootstrap admin account.
//!
//! Products are only inserted into an empty catalog. The admin account comes
//! from `SEED_ADMIN_EMAIL`, `SEED_ADMIN_NAME` and `SEED_ADMIN_PASSWORD`; it is
//! skipped when those are unset.

use std::path::Path;

use tracing::{info, warn};

use authentic_api::config::SeedAdminConfig;
use authentic_api::db::seed::{
    AdminOutcome, Catalog, CatalogOutcome, default_catalog, ensure_admin, seed_catalog,
};
use authentic_api::models::ProductDraft;

/// Read a YAML catalog file.
///
/// # Errors
///
/// Returns an error if the file is missing, malformed or empty.
pub async fn load_catalog(path: &Path) -> Result<Vec<ProductDraft>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }
    info!(path = %path.display(), "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, Box<dyn std::error::Error>> {
    let catalog: Catalog = serde_yaml::from_str(content)?;
    if catalog.products.is_empty() {
        return Err("catalog file lists no products".into());
    }
    Ok(catalog.products)
}

/// Run the seed command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read, the database is
/// unreachable, or a seeding step fails.
pub async fn run(catalog: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    // Read and validate input before connecting to database
    let drafts = match catalog {
        Some(path) => load_catalog(path).await?,
        None => default_catalog(),
    };
    let admin = SeedAdminConfig::load()?;

    let store = super::connect_store().await?;

    match seed_catalog(&store, drafts).await? {
        CatalogOutcome::Inserted(n) => info!(count = n, "Inserted products"),
        CatalogOutcome::AlreadyPopulated(n) => {
            info!(count = n, "Catalog already has products, nothing inserted");
        }
    }

    match admin {
        Some(admin) => match ensure_admin(&store, &admin).await? {
            AdminOutcome::Created => info!(email = %admin.email, "Admin account created"),
            AdminOutcome::Promoted => info!(email = %admin.email, "Existing account promoted"),
            AdminOutcome::AlreadyAdmin => info!(email = %admin.email, "Admin already present"),
        },
        None => warn!("SEED_ADMIN_EMAIL / SEED_ADMIN_PASSWORD not set, admin seeding skipped"),
    }

    store.close().await;
    Ok(())
}
