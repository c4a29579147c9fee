//! Catalog handlers. Reads are public; writes require an admin token.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::instrument;

use authentic_core::ProductId;

use crate::db::RepositoryError;
use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductDraft, ProductFilter, ProductPatch};
use crate::state::AppState;

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// Malformed ids cannot name a product.
fn parse_id(raw: &str) -> Result<ProductId> {
    raw.parse().map_err(|_| product_not_found())
}

/// List products, optionally by category and featured flag.
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.store().products.list(&filter).await?))
}

/// Show one product.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    let product = state
        .store()
        .products
        .get(id)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(product))
}

/// Add a product to the catalog.
#[instrument(skip(state, _admin, draft), fields(name = %draft.name))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<impl IntoResponse> {
    let product = draft.into_product(Utc::now()).map_err(AppError::BadRequest)?;
    state.store().products.insert(&product).await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Change some fields of a product.
#[instrument(skip(state, _admin, patch))]
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<Product>> {
    let id = parse_id(&id)?;
    let products = &state.store().products;
    let existing = products.get(id).await?.ok_or_else(product_not_found)?;
    let product = patch
        .apply(existing, Utc::now())
        .map_err(AppError::BadRequest)?;
    products.update(&product).await.map_err(|e| match e {
        RepositoryError::NotFound => product_not_found(),
        other => other.into(),
    })?;
    Ok(Json(product))
}

/// Remove a product from the catalog.
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&id)?;
    if !state.store().products.delete(id).await? {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
