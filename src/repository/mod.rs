//! Persistence ports and their adapters
//!
//! The service only sees these traits. `postgres` is the production adapter,
//! `memory` keeps the same contract in process.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::aggregates::{Cart, Product, ProductSnapshot};
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A line to merge into a user's active cart.
#[derive(Clone, Debug, PartialEq)]
pub struct NewLine {
    pub product_id: ProductId,
    pub snapshot: ProductSnapshot,
    pub quantity: Quantity,
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart with status `active`, if any. Other statuses are invisible here.
    async fn find_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>>;

    /// Upserts a whole cart.
    ///
    /// A cart without an id is inserted and gets its id here. A cart with an id is
    /// written only if its `version` still matches the stored one, otherwise
    /// `PersistenceError::Conflict`. Either the whole cart is written or nothing is.
    async fn save(&self, cart: Cart) -> Result<Cart>;

    /// Finds or creates the active cart and merges `line` into it as one atomic store
    /// operation: increments the matching item (replacing its snapshot) or appends it.
    async fn merge_item(&self, user_id: &UserId, line: NewLine) -> Result<Cart>;

    /// Every cart regardless of owner or status. Unbounded.
    async fn list_all(&self) -> Result<Vec<Cart>>;
}

/// Read-only view of the product catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Products for the ids that exist; unknown ids are simply absent.
    async fn find_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>>;

    async fn list_products(&self) -> Result<Vec<Product>>;
}

/// Owner display data for the admin listing.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_emails(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>>;
}
