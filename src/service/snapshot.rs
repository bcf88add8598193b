//! Product Snapshot Builder

use serde_json::Value;

use crate::domain::aggregates::{ProductSnapshot, SnapshotOrigin};
use crate::domain::value_objects::ProductId;
use crate::repository::CatalogLookup;
use crate::{CartError, Result};

/// Picks the display data a cart line will carry.
///
/// A well-formed caller snapshot is trusted as is and the catalog is not consulted.
/// A malformed one is a validation error. Without one the snapshot is derived from the
/// catalog, which must know the product.
pub async fn build_snapshot(catalog: &dyn CatalogLookup, product_id: &ProductId, supplied: Option<&Value>) -> Result<SnapshotOrigin> {
    if let Some(raw) = supplied {
        let snapshot = ProductSnapshot::from_supplied(product_id, raw).map_err(|e| {
            tracing::debug!(%product_id, error = %e, "rejected supplied snapshot");
            CartError::Validation(format!("Invalid product data: {e}"))
        })?;
        return Ok(SnapshotOrigin::Trusted(snapshot));
    }
    let product = catalog.find_product(product_id).await?.ok_or(CartError::ProductNotFound)?;
    Ok(SnapshotOrigin::Derived(ProductSnapshot::from_catalog(&product)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::repository::MemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id).unwrap(), name: None, title: Some("Lamp".into()), price: Decimal::new(500, 2),
            description: None, category: None, brand: None, stock: 3, thumbnail: None, images: vec![],
            rating: None, discount_percentage: None, created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_derived_from_catalog() {
        let store = MemoryStore::new();
        store.add_product(product("P1")).await;
        let origin = build_snapshot(&store, &ProductId::new("P1").unwrap(), None).await.unwrap();
        assert!(!origin.is_trusted());
        let s = origin.normalize(&ProductId::new("P1").unwrap());
        assert_eq!(s.name.as_deref(), Some("Lamp"));
        assert_eq!(s.stock, Some(3.0));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = MemoryStore::new();
        let res = build_snapshot(&store, &ProductId::new("nope").unwrap(), None).await;
        assert!(matches!(res, Err(CartError::ProductNotFound)));
    }

    #[tokio::test]
    async fn test_supplied_skips_catalog() {
        let store = MemoryStore::new();
        let raw = json!({"name": "From feed", "price": 9.99});
        let origin = build_snapshot(&store, &ProductId::new("ext-1").unwrap(), Some(&raw)).await.unwrap();
        assert!(origin.is_trusted());
    }

    #[tokio::test]
    async fn test_malformed_supplied_is_rejected() {
        let store = MemoryStore::new();
        store.add_product(product("P1")).await;
        let raw = json!("not an object");
        let res = build_snapshot(&store, &ProductId::new("P1").unwrap(), Some(&raw)).await;
        assert!(matches!(res, Err(CartError::Validation(_))));
        let res = build_snapshot(&store, &ProductId::new("P1").unwrap(), Some(&json!({"price": 3}))).await;
        assert!(matches!(res, Err(CartError::Validation(_))));
    }

    #[tokio::test]
    async fn test_feed_only_product_with_float_stock() {
        let store = MemoryStore::new();
        let raw = json!({"name": "Feed lamp", "price": 9.5, "stock": 4.0});
        let origin = build_snapshot(&store, &ProductId::new("feed-1").unwrap(), Some(&raw)).await.unwrap();
        assert!(origin.is_trusted());
    }
}
