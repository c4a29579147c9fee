//! Order workflow: placement, status changes and reads.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use authentic_core::{
    OrderId, OrderStatus, OrderValidationError, Transition, TransitionError, UserId, UserRole,
};

use crate::config::TotalPolicy;
use crate::db::{RepositoryError, Store};
use crate::models::{Order, OrderDraft, OrderView, User};
use crate::services::notifications::{NotificationDispatcher, OrderPlaced, Recipient};

/// Errors that can occur in the order workflow.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] OrderValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Order not found")]
    NotFound,

    /// The requester may not see this order.
    #[error("Not authorized")]
    NotOwner,

    /// The order changed status while the update was in flight.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// Who is asking to read an order.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: UserId,
    pub role: UserRole,
}

/// Order workflow over a [`Store`].
pub struct OrderService<'a> {
    store: &'a Store,
    notifier: &'a NotificationDispatcher,
    total_policy: TotalPolicy,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(
        store: &'a Store,
        notifier: &'a NotificationDispatcher,
        total_policy: TotalPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            total_policy,
        }
    }

    /// Place an order.
    ///
    /// `customer` is the account resolved from a valid bearer token, if any.
    /// It owns the order and receives the confirmation, even when guest
    /// contact details were submitted too; those are stored unchanged.
    /// Without a customer the guest contact details are used. When no email
    /// can be resolved the order is still placed and no mail is sent.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for an incomplete draft or, under
    /// [`TotalPolicy::Enforce`], a total that disagrees with the items.
    /// Returns `OrderError::Repository` if the order cannot be stored.
    #[instrument(skip_all, fields(customer = ?customer.map(|u| u.id)))]
    pub async fn place_order(
        &self,
        draft: OrderDraft,
        customer: Option<&User>,
    ) -> Result<Order, OrderError> {
        draft.validate()?;
        self.check_total(&draft)?;

        let guest_contact = draft.guest_info.clone();
        let order = draft.into_order(customer.map(|u| u.id), Utc::now())?;
        self.store.orders.insert(&order).await?;
        info!(
            order_id = %order.id,
            total = %order.total_price,
            guest = customer.is_none(),
            "Order placed"
        );

        let recipient = customer.map(Recipient::from_user).or_else(|| {
            let contact = guest_contact?;
            let email = contact.email_address();
            if email.is_none() {
                warn!(order_id = %order.id, "No usable email for order, notifications skipped");
            }
            Some(Recipient {
                email: email?,
                name: contact.name.filter(|n| !n.trim().is_empty()),
                phone: contact.phone.filter(|p| !p.trim().is_empty()),
            })
        });

        if let Some(recipient) = recipient {
            self.notifier.dispatch(OrderPlaced {
                order: order.clone(),
                recipient,
            });
        }

        Ok(order)
    }

    fn check_total(&self, draft: &OrderDraft) -> Result<(), OrderValidationError> {
        match (draft.verify_total(), self.total_policy) {
            (Ok(()), _) => Ok(()),
            (Err(OrderValidationError::TotalMismatch { submitted, computed }), TotalPolicy::Trust) => {
                warn!(%submitted, %computed, "Submitted total does not match items, keeping client total");
                Ok(())
            }
            (Err(e), _) => Err(e),
        }
    }

    /// Move an order to `target`.
    ///
    /// Requesting the current status returns the order unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` for an unknown order,
    /// `OrderError::Transition` when leaving a delivered or cancelled order,
    /// and `OrderError::Conflict` if the status changed concurrently.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self.store.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        let now = Utc::now();

        match order.fulfillment.apply(target, now)? {
            Transition::Unchanged(_) => Ok(order),
            Transition::Changed { from, next } => {
                let updated = self
                    .store
                    .orders
                    .update_fulfillment(id, from, next, now)
                    .await?;
                info!(order_id = %id, %from, to = %target, "Order status changed");
                Ok(updated)
            }
        }
    }

    /// Fetch one order for `viewer`, with its owner populated.
    ///
    /// Admins see every order; customers only orders attributed to them.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::NotOwner`.
    pub async fn get_for(&self, id: OrderId, viewer: Viewer) -> Result<OrderView, OrderError> {
        let order = self.store.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if viewer.role != UserRole::Admin && !order.owner.is_owned_by(viewer.user_id) {
            return Err(OrderError::NotOwner);
        }

        let owner = match order.user_id() {
            Some(user_id) => self.store.users.get_by_id(user_id).await?,
            None => None,
        };
        Ok(OrderView::populated(order, owner.as_ref()))
    }

    /// Orders attributed to `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on storage failure.
    pub async fn list_mine(&self, user: UserId) -> Result<Vec<OrderView>, OrderError> {
        Ok(self
            .store
            .orders
            .list_for_user(user)
            .await?
            .into_iter()
            .map(OrderView::new)
            .collect())
    }

    /// Every order (optionally one status), newest first, owners populated.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on storage failure.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<OrderView>, OrderError> {
        let orders = self.store.orders.list(status).await?;

        let mut ids: Vec<UserId> = orders.iter().filter_map(Order::user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let owners: HashMap<UserId, User> = self
            .store
            .users
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let owner = order.user_id().and_then(|id| owners.get(&id));
                OrderView::populated(order, owner)
            })
            .collect())
    }

    /// Number of orders awaiting fulfilment.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on storage failure.
    pub async fn pending_count(&self) -> Result<i64, OrderError> {
        Ok(self.store.orders.count(Some(OrderStatus::Pending)).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use authentic_core::{Email, Price};

    use super::*;
    use crate::models::NewUser;
    use crate::services::notifications::{MailSettings, RecordingTransport};

    struct Harness {
        store: Store,
        notifier: NotificationDispatcher,
        mail: RecordingTransport,
    }

    impl Harness {
        fn new() -> Self {
            let mail = RecordingTransport::new();
            let notifier = NotificationDispatcher::spawn(
                Arc::new(mail.clone()),
                MailSettings {
                    admin_email: Some(Email::parse("admin@authentic-ctg.com").unwrap()),
                    client_url: "http://localhost:5173".to_owned(),
                },
            );
            Self {
                store: Store::in_memory(),
                notifier,
                mail,
            }
        }

        fn service(&self, policy: TotalPolicy) -> OrderService<'_> {
            OrderService::new(&self.store, &self.notifier, policy)
        }

        async fn customer(&self, email: &str) -> User {
            self.store
                .users
                .create(NewUser {
                    name: "Sadia".to_owned(),
                    email: Email::parse(email).unwrap(),
                    password_hash: "hash".to_owned(),
                    role: UserRole::Customer,
                    phone: Some("01911000000".to_owned()),
                    google_id: None,
                    image: None,
                })
                .await
                .unwrap()
        }
    }

    fn draft(total: u32, guest_email: Option<&str>) -> OrderDraft {
        let mut body = serde_json::json!({
            "orderItems": [{"name": "Saree", "qty": 2, "image": "s.jpg", "price": 500,
                            "product": "0b7c5a1e-8d2f-4e4b-9a61-3f2d1c0e9a7b"}],
            "shippingAddress": {"address": "1 GEC Circle", "city": "Chittagong",
                                "postalCode": "4000", "country": "Bangladesh"},
            "paymentMethod": "Cash on Delivery",
            "totalPrice": total
        });
        if let Some(email) = guest_email {
            body["guestInfo"] = serde_json::json!({"name": "Guest", "email": email});
        }
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_guest_order_mails_guest() {
        let h = Harness::new();
        let order = h
            .service(TotalPolicy::Trust)
            .place_order(draft(1000, Some("guest@example.com")), None)
            .await
            .unwrap();
        assert_eq!(order.user_id(), None);
        assert_eq!(order.status(), OrderStatus::Pending);

        h.notifier.flush().await;
        let sent = h.mail.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to.as_str(), "guest@example.com");
    }

    #[tokio::test]
    async fn test_customer_takes_precedence_over_guest_info() {
        let h = Harness::new();
        let customer = h.customer("sadia@example.com").await;
        let order = h
            .service(TotalPolicy::Trust)
            .place_order(draft(1000, Some("someone-else@example.com")), Some(&customer))
            .await
            .unwrap();

        assert_eq!(order.user_id(), Some(customer.id));
        assert_eq!(
            order.owner.guest_info().unwrap().email.as_deref(),
            Some("someone-else@example.com")
        );

        h.notifier.flush().await;
        assert_eq!(h.mail.sent().await[0].to.as_str(), "sadia@example.com");
    }

    #[tokio::test]
    async fn test_guest_without_email_is_placed_silently() {
        let h = Harness::new();
        let mut d = draft(1000, None);
        d.guest_info = Some(authentic_core::GuestInfo {
            name: Some("Walk-in".to_owned()),
            email: None,
            phone: Some("01511000000".to_owned()),
        });
        h.service(TotalPolicy::Trust).place_order(d, None).await.unwrap();

        h.notifier.flush().await;
        assert!(h.mail.sent().await.is_empty());
        assert_eq!(h.store.orders.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_policy() {
        let h = Harness::new();
        let trusted = h
            .service(TotalPolicy::Trust)
            .place_order(draft(999, Some("g@example.com")), None)
            .await
            .unwrap();
        assert_eq!(trusted.total_price, Price::from_taka(999));

        let rejected = h
            .service(TotalPolicy::Enforce)
            .place_order(draft(999, Some("g@example.com")), None)
            .await;
        assert!(matches!(
            rejected,
            Err(OrderError::Validation(OrderValidationError::TotalMismatch { .. }))
        ));
        assert_eq!(h.store.orders.count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_status_changes() {
        let h = Harness::new();
        let service = h.service(TotalPolicy::Trust);
        let order = service
            .place_order(draft(1000, Some("g@example.com")), None)
            .await
            .unwrap();

        let delivered = service
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert!(delivered.fulfillment.is_delivered);
        let stamp = delivered.fulfillment.delivered_at;
        assert!(stamp.is_some());

        let again = service
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(again.fulfillment.delivered_at, stamp);

        assert!(matches!(
            service.update_status(order.id, OrderStatus::Pending).await,
            Err(OrderError::Transition(_))
        ));
        assert!(matches!(
            service.update_status(OrderId::generate(), OrderStatus::Cancelled).await,
            Err(OrderError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_read_access() {
        let h = Harness::new();
        let service = h.service(TotalPolicy::Trust);
        let owner = h.customer("owner@example.com").await;
        let other = h.customer("other@example.com").await;

        let order = service
            .place_order(draft(1000, None), Some(&owner))
            .await
            .unwrap();
        let guest_order = service
            .place_order(draft(1000, Some("g@example.com")), None)
            .await
            .unwrap();

        let as_owner = Viewer { user_id: owner.id, role: UserRole::Customer };
        let as_other = Viewer { user_id: other.id, role: UserRole::Customer };
        let as_admin = Viewer { user_id: other.id, role: UserRole::Admin };

        assert!(service.get_for(order.id, as_owner).await.is_ok());
        assert!(matches!(
            service.get_for(order.id, as_other).await,
            Err(OrderError::NotOwner)
        ));
        assert!(matches!(
            service.get_for(guest_order.id, as_owner).await,
            Err(OrderError::NotOwner)
        ));
        assert!(service.get_for(guest_order.id, as_admin).await.is_ok());

        assert_eq!(service.list_mine(owner.id).await.unwrap().len(), 1);
        assert_eq!(service.list_all(None).await.unwrap().len(), 2);
        assert_eq!(service.pending_count().await.unwrap(), 2);
    }
}
