//! Cart Aggregate
//!
//! Holds the merge rules for a user's active cart. Everything here is pure: the
//! repository decides when and how atomically a computed state is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::product::ProductSnapshot;
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::CartError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus { #[default] Active, Completed, Abandoned }

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Completed => "completed", Self::Abandoned => "abandoned" }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s { "active" => Some(Self::Active), "completed" => Some(Self::Completed), "abandoned" => Some(Self::Abandoned), _ => None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub product: ProductSnapshot,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Assigned by the repository on first save.
    pub id: Option<Uuid>,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every persisted write.
    #[serde(skip)]
    pub version: i64,
}

/// One mutation of a cart's item list.
#[derive(Clone, Debug, PartialEq)]
pub enum CartCommand {
    /// Merge by addition; the snapshot replaces the stored one.
    Add { product_id: ProductId, snapshot: ProductSnapshot, quantity: Quantity },
    /// Overwrite the quantity of an existing line.
    UpdateQuantity { product_id: ProductId, quantity: Quantity },
    Remove { product_id: ProductId },
    Clear,
}

impl Cart {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { id: None, user_id, items: vec![], status: CartStatus::Active, created_at: now, updated_at: now, version: 0 }
    }

    pub fn item(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.product_id == product_id)
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity.value())).sum()
    }

    pub fn is_active(&self) -> bool { self.status == CartStatus::Active }

    pub fn add_item(&mut self, product_id: ProductId, snapshot: ProductSnapshot, quantity: Quantity, now: DateTime<Utc>) -> Result<(), CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing.quantity.checked_add(quantity).map_err(|e| CartError::Validation(e.to_string()))?;
            existing.product = snapshot;
        } else {
            self.items.push(CartItem { product_id, product: snapshot, quantity, added_at: now });
        }
        self.touch(now);
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: Quantity, now: DateTime<Utc>) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| &i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.touch(now);
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &ProductId, now: DateTime<Utc>) -> Result<(), CartError> {
        let pos = self.items.iter().position(|i| &i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        self.items.remove(pos);
        self.touch(now);
        Ok(())
    }

    pub fn clear(&mut self, now: DateTime<Utc>) { self.items.clear(); self.touch(now); }

    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

/// Computes the next cart state.
///
/// Only `Add` may start from no cart; the other commands need an existing cart and
/// fail with `CartNotFound` otherwise. A cart that is not active is never passed in by
/// the repository, but one that is gets refused the same way. Status is never changed.
pub fn apply(existing: Option<Cart>, user_id: &UserId, command: CartCommand, now: DateTime<Utc>) -> Result<Cart, CartError> {
    let existing = existing.filter(Cart::is_active);
    match command {
        CartCommand::Add { product_id, snapshot, quantity } => {
            let mut cart = existing.unwrap_or_else(|| Cart::new(user_id.clone(), now));
            cart.add_item(product_id, snapshot, quantity, now)?;
            Ok(cart)
        }
        CartCommand::UpdateQuantity { product_id, quantity } => {
            let mut cart = existing.ok_or(CartError::CartNotFound)?;
            cart.update_quantity(&product_id, quantity, now)?;
            Ok(cart)
        }
        CartCommand::Remove { product_id } => {
            let mut cart = existing.ok_or(CartError::CartNotFound)?;
            cart.remove_item(&product_id, now)?;
            Ok(cart)
        }
        CartCommand::Clear => {
            let mut cart = existing.ok_or(CartError::CartNotFound)?;
            cart.clear(now);
            Ok(cart)
        }
    }
}
