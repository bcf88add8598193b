//! In-process store implementing every port behind one lock.
//!
//! Used when no database is configured and throughout the tests. The single
//! `Mutex` is what makes `merge_item` and `save` atomic here.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CartRepository, CatalogLookup, NewLine, UserDirectory};
use crate::domain::aggregates::{self, Cart, CartCommand, Product};
use crate::domain::value_objects::{ProductId, UserId};
use crate::{PersistenceError, Result};

#[derive(Default)]
struct MemoryState {
    carts: Vec<Cart>,
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, String>,
}

impl MemoryState {
    fn active_index(&self, user_id: &UserId) -> Option<usize> {
        self.carts.iter().position(|c| &c.user_id == user_id && c.is_active())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn add_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id.clone(), product);
    }

    pub async fn remove_product(&self, id: &ProductId) {
        self.state.lock().await.products.remove(id);
    }

    pub async fn add_user(&self, id: UserId, email: impl Into<String>) {
        self.state.lock().await.users.insert(id, email.into());
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>> {
        let state = self.state.lock().await;
        Ok(state.active_index(user_id).map(|i| state.carts[i].clone()))
    }

    async fn save(&self, mut cart: Cart) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let clash = |c: &Cart| c.user_id == cart.user_id && c.is_active() && c.id != cart.id;
        if cart.is_active() && state.carts.iter().any(clash) {
            return Err(PersistenceError::Conflict.into());
        }
        match cart.id {
            None => {
                cart.id = Some(Uuid::now_v7());
                cart.version = 1;
                state.carts.push(cart.clone());
            }
            Some(id) => {
                let stored = state.carts.iter_mut().find(|c| c.id == Some(id)).ok_or(PersistenceError::Conflict)?;
                if stored.version != cart.version { return Err(PersistenceError::Conflict.into()); }
                cart.version += 1;
                cart.created_at = stored.created_at;
                *stored = cart.clone();
            }
        }
        Ok(cart)
    }

    async fn merge_item(&self, user_id: &UserId, line: NewLine) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let index = state.active_index(user_id);
        let existing = index.map(|i| state.carts[i].clone());
        let command = CartCommand::Add { product_id: line.product_id, snapshot: line.snapshot, quantity: line.quantity };
        let mut cart = aggregates::apply(existing, user_id, command, Utc::now())?;
        cart.version += 1;
        match index {
            Some(i) => state.carts[i] = cart.clone(),
            None => {
                cart.id = Some(Uuid::now_v7());
                state.carts.push(cart.clone());
            }
        }
        Ok(cart)
    }

    async fn list_all(&self) -> Result<Vec<Cart>> {
        Ok(self.state.lock().await.carts.clone())
    }
}

#[async_trait]
impl CatalogLookup for MemoryStore {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).map(|p| (id.clone(), p.clone()))).collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.state.lock().await.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_emails(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).map(|e| (id.clone(), e.clone()))).collect())
    }
}
