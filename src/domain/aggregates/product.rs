//! Catalog product and the point-in-time snapshot a cart keeps of it

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::domain::value_objects::ProductId;

/// A product as the catalog currently describes it. Owned by the catalog; read-only here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub stock: i64,
    pub thumbnail: Option<String>,
    pub images: Vec<String>,
    pub rating: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Display name, falling back to the legacy title.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.title.as_deref())
    }
}

/// Live catalog fields shown next to a cart line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self { id: p.id.clone(), name: p.display_name().map(str::to_string), price: p.price }
    }
}

/// Display attributes copied into a cart item when it is added or merged.
///
/// Never refreshed from the catalog afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub discount_percentage: Option<f64>,
    /// Any JSON number; external feeds send `4.0` as readily as `4`.
    pub stock: Option<f64>,
}

impl ProductSnapshot {
    pub fn from_catalog(p: &Product) -> Self {
        Self {
            id: Some(p.id.as_str().to_string()),
            name: p.name.clone(),
            title: p.title.clone(),
            thumbnail: p.thumbnail.clone(),
            price: Some(p.price),
            brand: p.brand.clone(),
            description: p.description.clone(),
            rating: p.rating,
            discount_percentage: p.discount_percentage,
            stock: Some(p.stock as f64),
        }
    }

    /// Parses caller-supplied display data.
    ///
    /// Well-formed means: a JSON object matching the snapshot shape, carrying a name or
    /// title, and naming the same product if it names one at all.
    pub fn from_supplied(product_id: &ProductId, raw: &Value) -> Result<Self, SnapshotError> {
        if !raw.is_object() { return Err(SnapshotError::NotAnObject); }
        let snapshot: Self = serde_json::from_value(raw.clone()).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        if let Some(id) = snapshot.id.as_deref() {
            if id.trim() != product_id.as_str() { return Err(SnapshotError::IdMismatch); }
        }
        let has_label = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        if !has_label(&snapshot.name) && !has_label(&snapshot.title) { return Err(SnapshotError::MissingName); }
        Ok(snapshot)
    }
}

/// Where a snapshot came from. Both arms are normalized to the same stored shape.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotOrigin {
    /// Supplied by the caller and used verbatim.
    Trusted(ProductSnapshot),
    /// Built from the catalog record.
    Derived(ProductSnapshot),
}

impl SnapshotOrigin {
    pub fn is_trusted(&self) -> bool { matches!(self, Self::Trusted(_)) }

    /// Fills the id and treats name and title as aliases of each other.
    pub fn normalize(self, product_id: &ProductId) -> ProductSnapshot {
        let mut s = match self { Self::Trusted(s) | Self::Derived(s) => s };
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |x| x.trim().is_empty());
        if blank(&s.name) { s.name = s.title.clone().filter(|t| !t.trim().is_empty()); }
        if blank(&s.title) { s.title = s.name.clone(); }
        if s.id.is_none() { s.id = Some(product_id.as_str().to_string()); }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError { NotAnObject, Malformed(String), IdMismatch, MissingName }
impl std::error::Error for SnapshotError {}
impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "snapshot is not an object"),
            Self::Malformed(e) => write!(f, "malformed snapshot: {e}"),
            Self::IdMismatch => write!(f, "snapshot names a different product"),
            Self::MissingName => write!(f, "snapshot has neither name nor title"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pid() -> ProductId { ProductId::new("P1").unwrap() }

    fn catalog_product(name: Option<&str>, title: Option<&str>) -> Product {
        Product {
            id: pid(), name: name.map(Into::into), title: title.map(Into::into),
            price: Decimal::new(1999, 2), description: Some("desc".into()), category: None,
            brand: Some("Acme".into()), stock: 7, thumbnail: Some("t.png".into()), images: vec![],
            rating: Some(4.5), discount_percentage: Some(10.0), created_at: Utc::now(),
        }
    }

    #[test]
    fn test_name_fills_missing_title() {
        let s = SnapshotOrigin::Derived(ProductSnapshot::from_catalog(&catalog_product(Some("Widget"), None))).normalize(&pid());
        assert_eq!(s.name.as_deref(), Some("Widget"));
        assert_eq!(s.title.as_deref(), Some("Widget"));
        assert_eq!(s.price, Some(Decimal::new(1999, 2)));
        assert_eq!(s.stock, Some(7.0));
    }

    #[test]
    fn test_title_fills_missing_name() {
        let s = SnapshotOrigin::Derived(ProductSnapshot::from_catalog(&catalog_product(None, Some("Legacy")))).normalize(&pid());
        assert_eq!(s.name.as_deref(), Some("Legacy"));
        assert_eq!(s.title.as_deref(), Some("Legacy"));
    }

    #[test]
    fn test_supplied_snapshot_kept_verbatim() {
        let raw = json!({"_id": "P1", "name": "Feed item", "title": "Other", "price": 12.5, "brand": "Ext"});
        let s = ProductSnapshot::from_supplied(&pid(), &raw).unwrap();
        let origin = SnapshotOrigin::Trusted(s);
        assert!(origin.is_trusted());
        let s = origin.normalize(&pid());
        assert_eq!(s.name.as_deref(), Some("Feed item"));
        assert_eq!(s.title.as_deref(), Some("Other"));
        assert_eq!(s.price, Some(Decimal::new(125, 1)));
        assert_eq!(s.id.as_deref(), Some("P1"));
    }

    #[test]
    fn test_supplied_snapshot_rejections() {
        assert_eq!(ProductSnapshot::from_supplied(&pid(), &json!(["x"])), Err(SnapshotError::NotAnObject));
        assert_eq!(ProductSnapshot::from_supplied(&pid(), &json!({"id": "P2", "name": "x"})), Err(SnapshotError::IdMismatch));
        assert_eq!(ProductSnapshot::from_supplied(&pid(), &json!({"price": 3})), Err(SnapshotError::MissingName));
        assert!(matches!(ProductSnapshot::from_supplied(&pid(), &json!({"name": "x", "price": "cheap"})), Err(SnapshotError::Malformed(_))));
    }

    #[test]
    fn test_supplied_stock_accepts_any_number() {
        let s = ProductSnapshot::from_supplied(&pid(), &json!({"name": "Feed lamp", "price": 9.5, "stock": 4.0})).unwrap();
        assert_eq!(s.stock, Some(4.0));
        let s = ProductSnapshot::from_supplied(&pid(), &json!({"name": "Feed lamp", "stock": 4})).unwrap();
        assert_eq!(s.stock, Some(4.0));
    }

    #[test]
    fn test_summary_prefers_name() {
        let summary = ProductSummary::from(&catalog_product(None, Some("Legacy")));
        assert_eq!(summary.name.as_deref(), Some("Legacy"));
    }
}
