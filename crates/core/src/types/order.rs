//! Order value objects and the order status state machine.
//!
//! Item snapshots, shipping address and contact details are captured once
//! when an order is placed and never rewritten afterwards. The only mutable
//! part of an order is its [`Fulfillment`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{ProductId, UserId};
use super::price::Price;
use super::status::OrderStatus;

/// Reasons an order draft is rejected before it reaches the store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    /// The cart snapshot is empty.
    #[error("No order items")]
    NoItems,
    /// An item was submitted with a zero quantity.
    #[error("Quantity for {0} must be at least 1")]
    InvalidQuantity(String),
    /// A required text field is missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// Neither an authenticated owner nor guest contact details were supplied.
    #[error("Contact information is required")]
    MissingContact,
    /// Price x quantity over the items exceeds the largest storable amount.
    #[error("Order total is too large")]
    TotalOutOfRange,
    /// The submitted total disagrees with the item snapshots.
    #[error("Total price does not match order items")]
    TotalMismatch {
        /// Total sent by the client.
        submitted: Price,
        /// Sum of price x quantity over the items.
        computed: Price,
    },
}

/// One line of an order: a snapshot of the product at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product name as shown at checkout.
    pub name: String,
    /// Units ordered (at least 1).
    pub qty: u32,
    /// Product image reference at checkout.
    pub image: String,
    /// Unit price at checkout.
    pub price: Price,
    /// The catalog product this line was taken from.
    pub product: ProductId,
}

impl OrderItem {
    /// Price of this line (unit price x quantity), `None` if out of range.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.line_total(self.qty)
    }

    /// Check the snapshot is complete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for a zero quantity and `MissingField` for a
    /// blank name or image.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.name.trim().is_empty() {
            return Err(OrderValidationError::MissingField("Item name"));
        }
        if self.qty == 0 {
            return Err(OrderValidationError::InvalidQuantity(self.name.clone()));
        }
        if self.image.trim().is_empty() {
            return Err(OrderValidationError::MissingField("Item image"));
        }
        Ok(())
    }
}

/// Sum of price x quantity over a set of items.
///
/// # Errors
///
/// Returns `TotalOutOfRange` when a line or the sum exceeds [`Price::MAX`].
pub fn items_total(items: &[OrderItem]) -> Result<Price, OrderValidationError> {
    items
        .iter()
        .try_fold(Price::ZERO, |total, item| {
            item.line_total().and_then(|line| total.checked_add(line))
        })
        .ok_or(OrderValidationError::TotalOutOfRange)
}

/// Where an order is shipped. Every field is required.
///
/// Missing fields deserialise as blank so [`ShippingAddress::validate`] can
/// name the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Check no field is blank.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` naming the first blank field.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        let fields = [
            ("Address", &self.address),
            ("City", &self.city),
            ("Postal code", &self.postal_code),
            ("Country", &self.country),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(OrderValidationError::MissingField(label));
            }
        }
        Ok(())
    }
}

/// Contact details typed into the checkout form.
///
/// Stored exactly as submitted, including for signed-in buyers, so the email
/// here is kept as raw text and only parsed when a message is addressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl GuestInfo {
    /// True when no field carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.name, &self.email, &self.phone]
            .iter()
            .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }

    /// The submitted email, if present and well-formed.
    #[must_use]
    pub fn email_address(&self) -> Option<Email> {
        self.email.as_deref().and_then(|raw| Email::parse(raw).ok())
    }
}

/// Mobile-wallet payment proof supplied at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Who an order belongs to.
///
/// An order is either attributed to a signed-in customer or carried by guest
/// contact details; it is never anonymous. The contact details typed at
/// checkout are kept in both cases, even when they differ from the
/// customer's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOwner {
    /// Placed with a valid bearer credential.
    Customer {
        user_id: UserId,
        contact: Option<GuestInfo>,
    },
    /// Placed without a (valid) credential.
    Guest { contact: GuestInfo },
}

impl OrderOwner {
    /// Build the owner from an optional attributed user and optional contact.
    ///
    /// A customer keeps the contact exactly as submitted. Without a customer,
    /// empty contact details count as absent and `None` is returned.
    #[must_use]
    pub fn resolve(user_id: Option<UserId>, contact: Option<GuestInfo>) -> Option<Self> {
        match (user_id, contact) {
            (Some(user_id), contact) => Some(Self::Customer { user_id, contact }),
            (None, Some(contact)) if !contact.is_empty() => Some(Self::Guest { contact }),
            (None, _) => None,
        }
    }

    /// The attributed customer, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Customer { user_id, .. } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    /// Contact details submitted at checkout, if any.
    #[must_use]
    pub const fn guest_info(&self) -> Option<&GuestInfo> {
        match self {
            Self::Customer { contact, .. } => contact.as_ref(),
            Self::Guest { contact } => Some(contact),
        }
    }

    /// Whether the order is attributed to `user`.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id() == Some(user)
    }
}

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Delivered and cancelled orders are final.
    #[error("Cannot change a {from} order to {to}")]
    FromTerminal { from: OrderStatus, to: OrderStatus },
}

/// Outcome of applying a target status to a [`Fulfillment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order is already in the requested status; nothing to write.
    Unchanged(Fulfillment),
    /// The order moves to a new status.
    Changed {
        from: OrderStatus,
        next: Fulfillment,
    },
}

impl Transition {
    /// Fulfillment state after the transition.
    #[must_use]
    pub const fn fulfillment(&self) -> Fulfillment {
        match self {
            Self::Unchanged(state) | Self::Changed { next: state, .. } => *state,
        }
    }
}

/// The mutable part of an order: status plus the delivery flags derived
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub status: OrderStatus,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Default for Fulfillment {
    fn default() -> Self {
        Self::pending()
    }
}

impl Fulfillment {
    /// State of a freshly placed order.
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: OrderStatus::Pending,
            is_delivered: false,
            delivered_at: None,
        }
    }

    /// Apply an administrator's status change.
    ///
    /// - Requesting the current status is a no-op (the original
    ///   `delivered_at` is kept).
    /// - Terminal statuses cannot be left.
    /// - `Delivered` stamps `delivered_at = now`; any other target clears the
    ///   delivery flags.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::FromTerminal` when the order is delivered or
    /// cancelled and a different status is requested.
    pub fn apply(
        &self,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition, TransitionError> {
        if self.status == target {
            return Ok(Transition::Unchanged(*self));
        }
        if self.status.is_terminal() {
            return Err(TransitionError::FromTerminal {
                from: self.status,
                to: target,
            });
        }

        let next = match target {
            OrderStatus::Delivered => Self {
                status: target,
                is_delivered: true,
                delivered_at: Some(now),
            },
            OrderStatus::Pending | OrderStatus::Cancelled => Self {
                status: target,
                is_delivered: false,
                delivered_at: None,
            },
        };

        Ok(Transition::Changed {
            from: self.status,
            next,
        })
    }
}
