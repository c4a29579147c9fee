//! In-memory repositories.
//!
//! Same contracts as the Postgres repositories (case-insensitive email
//! uniqueness, unique Google ids, guarded status updates) so the HTTP layer
//! can be exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use authentic_core::{Email, Fulfillment, OrderId, OrderStatus, ProductId, UserId, UserRole};

use super::{OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::{NewUser, Order, Product, ProductFilter, User};

/// Users keyed by id, with their password hashes.
#[derive(Default)]
pub struct InMemoryUsers {
    storage: RwLock<HashMap<UserId, (User, String)>>,
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage.get(&id).map(|(user, _)| user.clone()))
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| storage.get(id).map(|(user, _)| user.clone()))
            .collect())
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .get_password_hash(email)
            .await?
            .map(|(user, _)| user))
    }

    async fn get_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|(user, _)| user.google_id.as_deref() == Some(google_id))
            .map(|(user, _)| user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|(user, _)| user.email == *email)
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut storage = self.storage.write().await;
        if storage.values().any(|(user, _)| user.email == new_user.email) {
            return Err(RepositoryError::Conflict("user already exists".to_owned()));
        }
        if let Some(google_id) = new_user.google_id.as_deref()
            && storage
                .values()
                .any(|(user, _)| user.google_id.as_deref() == Some(google_id))
        {
            return Err(RepositoryError::Conflict(
                "google account already linked".to_owned(),
            ));
        }

        let (user, password_hash) = new_user.into_user(Utc::now());
        storage.insert(user.id, (user.clone(), password_hash));
        Ok(user)
    }

    async fn link_google(
        &self,
        id: UserId,
        google_id: &str,
        image: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let mut storage = self.storage.write().await;
        if storage
            .values()
            .any(|(user, _)| user.id != id && user.google_id.as_deref() == Some(google_id))
        {
            return Err(RepositoryError::Conflict(
                "google account already linked".to_owned(),
            ));
        }

        let (user, _) = storage.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.google_id = Some(google_id.to_owned());
        if let Some(image) = image {
            user.image = Some(image.to_owned());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_role(
        &self,
        email: &Email,
        role: UserRole,
    ) -> Result<Option<User>, RepositoryError> {
        let mut storage = self.storage.write().await;
        let Some((user, _)) = storage.values_mut().find(|(user, _)| user.email == *email) else {
            return Ok(None);
        };
        user.role = role;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let storage = self.storage.read().await;
        let mut users: Vec<User> = storage
            .values()
            .filter(|(user, _)| user.role == role)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn delete_by_role(&self, role: UserRole) -> Result<u64, RepositoryError> {
        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|_, (user, _)| user.role != role);
        Ok(u64::try_from(before - storage.len()).unwrap_or(u64::MAX))
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64, RepositoryError> {
        let storage = self.storage.read().await;
        let count = storage.values().filter(|(user, _)| user.role == role).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

/// Products in insertion order.
#[derive(Default)]
pub struct InMemoryProducts {
    storage: RwLock<Vec<Product>>,
}

#[async_trait]
impl ProductRepository for InMemoryProducts {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut storage = self.storage.write().await;
        if storage.iter().any(|p| p.id == product.id) {
            return Err(RepositoryError::Conflict("product already exists".to_owned()));
        }
        storage.push(product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut storage = self.storage.write().await;
        let slot = storage
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = product.clone();
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut storage = self.storage.write().await;
        let before = storage.len();
        storage.retain(|p| p.id != id);
        Ok(storage.len() < before)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(i64::try_from(storage.len()).unwrap_or(i64::MAX))
    }
}

/// Orders in insertion order.
#[derive(Default)]
pub struct InMemoryOrders {
    storage: RwLock<Vec<Order>>,
}

/// Newest first; insertion order breaks timestamp ties.
fn newest_first<'a>(orders: impl DoubleEndedIterator<Item = &'a Order>) -> Vec<Order> {
    let mut orders: Vec<Order> = orders.rev().cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut storage = self.storage.write().await;
        if storage.iter().any(|o| o.id == order.id) {
            return Err(RepositoryError::Conflict("order already exists".to_owned()));
        }
        storage.push(order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(storage.iter().find(|o| o.id == id).cloned())
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(newest_first(
            storage
                .iter()
                .filter(|o| status.is_none_or(|s| o.status() == s)),
        ))
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let storage = self.storage.read().await;
        Ok(newest_first(
            storage.iter().filter(|o| o.owner.is_owned_by(user)),
        ))
    }

    async fn count(&self, status: Option<OrderStatus>) -> Result<i64, RepositoryError> {
        let storage = self.storage.read().await;
        let count = storage
            .iter()
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn update_fulfillment(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: Fulfillment,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let mut storage = self.storage.write().await;
        let order = storage
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if order.status() != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is no longer {expected}"
            )));
        }
        order.fulfillment = next;
        order.updated_at = now;
        Ok(order.clone())
    }
}
