//! Cart Service: one entry point per use case
//!
//! Validates request shape, gathers product data, and hands the actual state change
//! to the merge rules in [`crate::domain::aggregates::cart`] through the repository.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationErrors};

use crate::domain::aggregates::{self, Cart, CartCommand, Product};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{IdError, ProductId, Quantity, UserId};
use crate::events::EventPublisher;
use crate::repository::{CartRepository, CatalogLookup, NewLine, UserDirectory};
use crate::{CartError, Result};

pub mod snapshot;
pub mod views;

pub use snapshot::build_snapshot;
pub use views::{CartView, ItemView, OwnerSummary};

const PRODUCT_ID_REQUIRED: &str = "ProductId is required";
const UPDATE_INPUT_INVALID: &str = "ProductId and valid quantity are required";

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[validate(required(message = "ProductId is required"), length(min = 1, message = "ProductId is required"))]
    pub product_id: Option<String>,
    /// Defaults to 1. Numbers and numeric strings are accepted.
    pub quantity: Option<Value>,
    /// Optional display data to store instead of the catalog's.
    pub product: Option<Value>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantityRequest {
    #[validate(required(message = "ProductId and valid quantity are required"), length(min = 1, message = "ProductId and valid quantity are required"))]
    pub product_id: Option<String>,
    #[validate(required(message = "ProductId and valid quantity are required"))]
    pub quantity: Option<Value>,
}

fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    fields.iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

/// `message` covers a missing or blank id; an overlong one gets its own message.
fn product_id(raw: Option<&str>, message: &str) -> Result<ProductId> {
    match raw.map(ProductId::new) {
        Some(Ok(id)) => Ok(id),
        Some(Err(IdError::TooLong)) => Err(CartError::Validation(format!("ProductId must be at most {} characters", ProductId::MAX_LEN))),
        Some(Err(IdError::Empty)) | None => Err(CartError::Validation(message.to_string())),
    }
}

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogLookup>,
    users: Arc<dyn UserDirectory>,
    events: EventPublisher,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogLookup>, users: Arc<dyn UserDirectory>, events: EventPublisher) -> Self {
        Self { carts, catalog, users, events }
    }

    /// Adds `quantity` of a product to the user's active cart, creating the cart if needed.
    #[tracing::instrument(skip(self, req), fields(user_id = %user_id, product_id = tracing::field::Empty))]
    pub async fn add_item(&self, user_id: &UserId, req: AddItemRequest) -> Result<CartView> {
        req.validate().map_err(|e| CartError::Validation(validation_message(&e)))?;
        let product_id = product_id(req.product_id.as_deref(), PRODUCT_ID_REQUIRED)?;
        tracing::Span::current().record("product_id", product_id.as_str());
        let quantity = match &req.quantity {
            None => Quantity::ONE,
            Some(raw) => Quantity::coerce(raw).map_err(|e| CartError::Validation(format!("Invalid quantity: {e}")))?,
        };

        let origin = build_snapshot(self.catalog.as_ref(), &product_id, req.product.as_ref()).await?;
        let trusted = origin.is_trusted();
        let snapshot = origin.normalize(&product_id);

        let cart = self.carts.merge_item(user_id, NewLine { product_id: product_id.clone(), snapshot, quantity }).await?;
        let merged = cart.item(&product_id).map_or(quantity, |i| i.quantity);
        info!(added = quantity.value(), quantity = merged.value(), trusted, "item merged into cart");

        self.events.publish(CartEvent::ItemAdded {
            cart_id: cart.id, user_id: user_id.clone(), product_id, added: quantity, quantity: merged, at: cart.updated_at,
        }).await;
        Ok(self.view(cart).await)
    }

    /// The user's active cart with `totalItems`; an empty view when there is none.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<CartView> {
        match self.carts.find_active_cart(user_id).await? {
            Some(cart) => Ok(self.view(cart).await),
            None => {
                debug!("no active cart");
                Ok(CartView::empty(user_id.clone()))
            }
        }
    }

    /// Sets the quantity of an existing line to exactly the given value.
    #[tracing::instrument(skip(self, req), fields(user_id = %user_id))]
    pub async fn update_quantity(&self, user_id: &UserId, req: UpdateQuantityRequest) -> Result<CartView> {
        req.validate().map_err(|e| CartError::Validation(validation_message(&e)))?;
        let product_id = product_id(req.product_id.as_deref(), UPDATE_INPUT_INVALID)?;
        let quantity = req.quantity.as_ref()
            .and_then(|raw| Quantity::coerce(raw).ok())
            .ok_or_else(|| CartError::Validation(UPDATE_INPUT_INVALID.to_string()))?;

        let command = CartCommand::UpdateQuantity { product_id: product_id.clone(), quantity };
        let cart = self.mutate(user_id, command).await?;
        self.events.publish(CartEvent::QuantityUpdated {
            cart_id: cart.id, user_id: user_id.clone(), product_id, quantity, at: cart.updated_at,
        }).await;
        Ok(self.view(cart).await)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove_item(&self, user_id: &UserId, product_id: &str) -> Result<CartView> {
        let product_id = self::product_id(Some(product_id), PRODUCT_ID_REQUIRED)?;
        let cart = self.mutate(user_id, CartCommand::Remove { product_id: product_id.clone() }).await?;
        self.events.publish(CartEvent::ItemRemoved { cart_id: cart.id, user_id: user_id.clone(), product_id, at: cart.updated_at }).await;
        Ok(self.view(cart).await)
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &UserId) -> Result<CartView> {
        let cart = self.mutate(user_id, CartCommand::Clear).await?;
        self.events.publish(CartEvent::Cleared { cart_id: cart.id, user_id: user_id.clone(), at: cart.updated_at }).await;
        Ok(self.view(cart).await)
    }

    /// Every cart in the store with owner and catalog fields resolved. Operator use only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_carts(&self) -> Result<Vec<CartView>> {
        let carts = self.carts.list_all().await?;
        let catalog = self.resolve_catalog(&carts).await;
        let owners: Vec<UserId> = carts.iter().map(|c| c.user_id.clone()).collect::<HashSet<_>>().into_iter().collect();
        let mut emails = self.users.find_emails(&owners).await.unwrap_or_else(|e| {
            warn!(error = %e, "could not resolve cart owners");
            HashMap::new()
        });
        info!(count = carts.len(), "listing all carts");
        Ok(carts.into_iter().map(|cart| {
            let email = emails.remove(&cart.user_id);
            CartView::from_cart(cart, &catalog).with_owner(email)
        }).collect())
    }

    pub async fn get_product(&self, id: &str) -> Result<Product> {
        let id = ProductId::new(id).map_err(|_| CartError::ProductNotFound)?;
        self.catalog.find_product(&id).await?.ok_or(CartError::ProductNotFound)
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.catalog.list_products().await
    }

    /// Load, apply, save. The save is version-checked, so a concurrent write in between
    /// surfaces as a conflict instead of being overwritten.
    async fn mutate(&self, user_id: &UserId, command: CartCommand) -> Result<Cart> {
        let existing = self.carts.find_active_cart(user_id).await?;
        let next = aggregates::apply(existing, user_id, command, Utc::now()).map_err(|e| {
            debug!(error = %e, "cart command rejected");
            e
        })?;
        self.carts.save(next).await.map_err(|e| {
            tracing::error!(error = %e, "failed to save cart");
            e
        })
    }

    async fn view(&self, cart: Cart) -> CartView {
        let catalog = self.resolve_catalog(std::slice::from_ref(&cart)).await;
        CartView::from_cart(cart, &catalog)
    }

    /// Best effort: a catalog outage leaves the live fields empty instead of failing.
    async fn resolve_catalog(&self, carts: &[Cart]) -> HashMap<ProductId, Product> {
        let ids: HashSet<ProductId> = carts.iter().flat_map(|c| c.items.iter().map(|i| i.product_id.clone())).collect();
        if ids.is_empty() { return HashMap::new(); }
        let ids: Vec<ProductId> = ids.into_iter().collect();
        self.catalog.find_products(&ids).await.unwrap_or_else(|e| {
            warn!(error = %e, "could not resolve catalog fields");
            HashMap::new()
        })
    }
}
