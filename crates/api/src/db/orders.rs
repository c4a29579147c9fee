//! Order repository for `PostgreSQL`.
//!
//! Item snapshots, addresses, contact info and payment details are embedded
//! documents and live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use authentic_core::{
    Fulfillment, GuestInfo, OrderId, OrderItem, OrderOwner, OrderStatus, PaymentDetails,
    PaymentMethod, Price, ShippingAddress, UserId,
};

use super::{OrderRepository, RepositoryError};
use crate::models::Order;

const ORDER_COLUMNS: &str = "id, user_id, guest_info, order_items, shipping_address, payment_method, \
     payment_details, total_price, status, is_paid, paid_at, is_delivered, delivered_at, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    guest_info: Option<Json<GuestInfo>>,
    order_items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_details: Option<Json<PaymentDetails>>,
    total_price: Price,
    status: OrderStatus,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let owner = OrderOwner::resolve(row.user_id, row.guest_info.map(|Json(g)| g))
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order {} has neither user nor guest info",
                    row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            owner,
            items: row.order_items.0,
            shipping_address: row.shipping_address.0,
            payment_method: PaymentMethod::from(row.payment_method),
            payment_details: row.payment_details.map(|Json(d)| d),
            total_price: row.total_price,
            fulfillment: Fulfillment {
                status: row.status,
                is_delivered: row.is_delivered,
                delivered_at: row.delivered_at,
            },
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed [`OrderRepository`].
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO orders (
                id, user_id, guest_info, order_items, shipping_address, payment_method,
                payment_details, total_price, status, is_paid, paid_at, is_delivered,
                delivered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ",
        )
        .bind(order.id)
        .bind(order.owner.user_id())
        .bind(order.owner.guest_info().map(Json))
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method.as_str())
        .bind(order.payment_details.as_ref().map(Json))
        .bind(order.total_price)
        .bind(order.fulfillment.status)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.fulfillment.is_delivered)
        .bind(order.fulfillment.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order"))?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }

    async fn count(&self, status: Option<OrderStatus>) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn update_fulfillment(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: Fulfillment,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"
            UPDATE orders
            SET status = $3, is_delivered = $4, delivered_at = $5, updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(expected)
            .bind(next.status)
            .bind(next.is_delivered)
            .bind(next.delivered_at)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Order::try_from(row);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists {
            Err(RepositoryError::Conflict(format!(
                "order {id} is no longer {expected}"
            )))
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}
