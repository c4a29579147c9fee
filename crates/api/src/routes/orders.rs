//! Checkout and customer order handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use authentic_core::OrderId;

use crate::error::{ApiJson, AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{OrderDraft, OrderView};
use crate::services::orders::{OrderError, Viewer};
use crate::state::AppState;

/// Place an order as a guest or as the token's customer.
///
/// An invalid or expired token does not block checkout; the order is then
/// placed as a guest order.
#[instrument(skip(state, customer, draft), fields(customer = ?customer.as_ref().map(|u| u.id)))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(customer): OptionalAuth,
    ApiJson(draft): ApiJson<OrderDraft>,
) -> Result<impl IntoResponse> {
    let order = state.orders().place_order(draft, customer.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(OrderView::new(order))))
}

/// Orders placed by the signed-in customer, newest first.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn mine(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_mine(auth.user.id).await?))
}

/// One order, for its owner or an admin.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<OrderView>> {
    let id: OrderId = id
        .parse()
        .map_err(|_| AppError::Order(OrderError::NotFound))?;
    let viewer = Viewer {
        user_id: auth.user.id,
        role: auth.role,
    };
    Ok(Json(state.orders().get_for(id, viewer).await?))
}
