//! Read shapes returned by the service

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem, CartStatus, Product, ProductSnapshot, ProductSummary};
use crate::domain::value_objects::{ProductId, Quantity, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: UserId,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub product_id: ProductId,
    pub product: ProductSnapshot,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
    /// Current catalog data, absent when the product left the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<ProductSummary>,
}

/// A cart plus its derived totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSummary>,
    pub items: Vec<ItemView>,
    pub total_items: u64,
    pub status: CartStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartView {
    /// What a user without a cart sees.
    pub fn empty(user_id: UserId) -> Self {
        Self { id: None, user_id, owner: None, items: vec![], total_items: 0, status: CartStatus::Active, created_at: None, updated_at: None }
    }

    pub fn from_cart(cart: Cart, catalog: &HashMap<ProductId, Product>) -> Self {
        let total_items = cart.total_items();
        let items = cart.items.into_iter().map(|item| ItemView::new(item, catalog)).collect();
        Self {
            id: cart.id, user_id: cart.user_id, owner: None, items, total_items, status: cart.status,
            created_at: Some(cart.created_at), updated_at: Some(cart.updated_at),
        }
    }

    pub fn with_owner(mut self, email: Option<String>) -> Self {
        self.owner = email.map(|email| OwnerSummary { id: self.user_id.clone(), email });
        self
    }
}

impl ItemView {
    fn new(item: CartItem, catalog: &HashMap<ProductId, Product>) -> Self {
        let catalog = catalog.get(&item.product_id).map(ProductSummary::from);
        Self { product_id: item.product_id, product: item.product, quantity: item.quantity, added_at: item.added_at, catalog }
    }
}
