//! Admin console handlers. Every route here requires an admin token.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use authentic_core::{OrderId, OrderStatus, UserRole};

use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::OrderView;
use crate::services::orders::OrderError;
use crate::state::AppState;

/// Dashboard counters.
#[derive(Debug, Serialize)]
pub struct Stats {
    pub products: i64,
    pub orders: i64,
    pub customers: i64,
}

/// `?status=` filter on the order list.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
}

/// Status change request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid status".to_string()))
}

/// Catalog, order and customer counts.
#[instrument(skip_all)]
pub async fn stats(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<Stats>> {
    let store = state.store();
    Ok(Json(Stats {
        products: store.products.count().await?,
        orders: store.orders.count(None).await?,
        customers: store.users.count_by_role(UserRole::Customer).await?,
    }))
}

/// Every order with its owner populated, newest first.
#[instrument(skip(state, _admin, params), fields(status = ?params.status))]
pub async fn orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Vec<OrderView>>> {
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    Ok(Json(state.orders().list_all(status).await?))
}

/// Number of pending orders, for the console badge.
#[instrument(skip_all)]
pub async fn pending_count(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Value>> {
    let count = state.orders().pending_count().await?;
    Ok(Json(json!({ "count": count })))
}

/// Move an order to a new status.
#[instrument(skip(state, admin, update), fields(admin = %admin.0.user.id))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let target = parse_status(update.status.as_deref().unwrap_or_default())?;
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::Order(OrderError::NotFound))?;
    let order = state.orders().update_status(id, target).await?;
    Ok(Json(OrderView::new(order)))
}
