//! Order domain types and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authentic_core::{
    Email, Fulfillment, GuestInfo, OrderId, OrderItem, OrderOwner, OrderStatus,
    OrderValidationError, PaymentDetails, PaymentMethod, Price, ShippingAddress, UserId,
    items_total,
};

use super::user::User;

/// A placed order (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub owner: OrderOwner,
    /// Item snapshots captured at checkout. Never rewritten.
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_details: Option<PaymentDetails>,
    /// Total as submitted by the client.
    pub total_price: Price,
    pub fulfillment: Fulfillment,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.fulfillment.status
    }

    /// Attributed customer, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.owner.user_id()
    }
}

/// Checkout request body.
///
/// Every field is optional at the wire level so validation can answer with
/// the same messages the storefront client already shows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub guest_info: Option<GuestInfo>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default)]
    pub total_price: Option<Price>,
}

impl OrderDraft {
    /// Check items, shipping address and total are present and well-formed.
    ///
    /// # Errors
    ///
    /// Returns the first `OrderValidationError` found, starting with an
    /// empty cart.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.order_items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        for item in &self.order_items {
            item.validate()?;
        }
        self.shipping_address
            .as_ref()
            .ok_or(OrderValidationError::MissingField("Shipping address"))?
            .validate()?;
        if self.total_price.is_none() {
            return Err(OrderValidationError::MissingField("Total price"));
        }
        Ok(())
    }

    /// Recomputed sum of price x quantity over the submitted items.
    ///
    /// # Errors
    ///
    /// Returns `TotalOutOfRange` when the sum exceeds [`Price::MAX`].
    pub fn items_total(&self) -> Result<Price, OrderValidationError> {
        items_total(&self.order_items)
    }

    /// Compare the submitted total with [`OrderDraft::items_total`].
    ///
    /// # Errors
    ///
    /// Returns `TotalOutOfRange` when the items cannot be summed and
    /// `TotalMismatch` with both amounts when the totals differ.
    pub fn verify_total(&self) -> Result<(), OrderValidationError> {
        let computed = self.items_total()?;
        let submitted = self.total_price.unwrap_or(Price::ZERO);
        if submitted == computed {
            Ok(())
        } else {
            Err(OrderValidationError::TotalMismatch {
                submitted,
                computed,
            })
        }
    }

    /// Turn a draft that passed [`OrderDraft::validate`] into a pending
    /// order attributed to `user_id` (if any).
    ///
    /// # Errors
    ///
    /// Returns `MissingContact` when there is neither a user nor guest
    /// contact info.
    pub fn into_order(
        self,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderValidationError> {
        let owner = OrderOwner::resolve(user_id, self.guest_info)
            .ok_or(OrderValidationError::MissingContact)?;
        let payment_details = self
            .payment_details
            .filter(|d| d.transaction_id.is_some() || d.phone_number.is_some());

        Ok(Order {
            id: OrderId::generate(),
            owner,
            items: self.order_items,
            shipping_address: self.shipping_address.unwrap_or_default(),
            payment_method: self.payment_method.unwrap_or_default(),
            payment_details,
            total_price: self.total_price.unwrap_or(Price::ZERO),
            fulfillment: Fulfillment::pending(),
            is_paid: false,
            paid_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Owner fields exposed when an order's user is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderOwnerView {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<&User> for OrderOwnerView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// The `user` field of an order: a bare id, or the populated owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderUser {
    Id(UserId),
    Populated(OrderOwnerView),
}

/// Order as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// `null` for guest orders.
    pub user: Option<OrderUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_info: Option<GuestInfo>,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    pub total_price: Price,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// View with the user reported as a bare id.
    #[must_use]
    pub fn new(order: Order) -> Self {
        let user = order.user_id().map(OrderUser::Id);
        Self::with_user(order, user)
    }

    /// View with the owner populated. A missing account yields `null`.
    #[must_use]
    pub fn populated(order: Order, owner: Option<&User>) -> Self {
        let user = owner.map(|u| OrderUser::Populated(OrderOwnerView::from(u)));
        Self::with_user(order, user)
    }

    fn with_user(order: Order, user: Option<OrderUser>) -> Self {
        let guest_info = order.owner.guest_info().cloned();
        Self {
            id: order.id,
            user,
            guest_info,
            order_items: order.items,
            shipping_address: order.shipping_address,
            payment_method: order.payment_method,
            payment_details: order.payment_details,
            total_price: order.total_price,
            status: order.fulfillment.status,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.fulfillment.is_delivered,
            delivered_at: order.fulfillment.delivered_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
