//! PostgreSQL adapter.
//!
//! Carts and their lines live in `carts` / `cart_items`; a line's snapshot is a
//! JSONB document. `products` and `users` belong to other services and are only read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use super::{CartRepository, CatalogLookup, NewLine, UserDirectory};
use crate::domain::aggregates::{Cart, CartItem, CartStatus, Product, ProductSnapshot};
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::{CartError, PersistenceError, Result};

const CART_COLUMNS: &str = "id, user_id, status, version, created_at, updated_at";
const ITEM_COLUMNS: &str = "cart_id, product_id, product, quantity, added_at";
const PRODUCT_COLUMNS: &str = "id, name, title, price, description, category, brand, stock, thumbnail, images, rating, discount_percentage, created_at";

#[derive(Debug, sqlx::FromRow)]
struct CartRow { id: Uuid, user_id: String, status: String, version: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct ItemRow { cart_id: Uuid, product_id: String, product: Json<ProductSnapshot>, quantity: i64, added_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String, name: Option<String>, title: Option<String>, price: Decimal, description: Option<String>,
    category: Option<String>, brand: Option<String>, stock: i32, thumbnail: Option<String>, images: Vec<String>,
    rating: Option<f64>, discount_percentage: Option<f64>, created_at: DateTime<Utc>,
}

fn corrupt(what: impl std::fmt::Display) -> CartError { PersistenceError::Corrupt(what.to_string()).into() }

impl TryFrom<ItemRow> for CartItem {
    type Error = CartError;
    fn try_from(r: ItemRow) -> Result<Self> {
        let quantity = u32::try_from(r.quantity).ok().and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| corrupt(format!("quantity {} on cart {}", r.quantity, r.cart_id)))?;
        Ok(CartItem { product_id: ProductId::new(r.product_id).map_err(corrupt)?, product: r.product.0, quantity, added_at: r.added_at })
    }
}

impl CartRow {
    fn into_cart(self, items: Vec<CartItem>) -> Result<Cart> {
        let status = CartStatus::parse(&self.status).ok_or_else(|| corrupt(format!("cart status {}", self.status)))?;
        Ok(Cart {
            id: Some(self.id), user_id: UserId::new(self.user_id).map_err(corrupt)?, items, status,
            created_at: self.created_at, updated_at: self.updated_at, version: self.version,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = CartError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: ProductId::new(r.id).map_err(corrupt)?, name: r.name, title: r.title, price: r.price,
            description: r.description, category: r.category, brand: r.brand, stock: i64::from(r.stock),
            thumbnail: r.thumbnail, images: r.images, rating: r.rating, discount_percentage: r.discount_percentage,
            created_at: r.created_at,
        })
    }
}

/// Unique violations mean another writer got there first; check violations come from
/// the quantity bounds on `cart_items`.
fn map_write_error(e: sqlx::Error) -> CartError {
    let code = e.as_database_error().and_then(|d| d.code()).map(|c| c.into_owned());
    match code.as_deref() {
        Some("23505") => PersistenceError::Conflict.into(),
        Some("23514") => CartError::Validation("quantity is too large".into()),
        _ => e.into(),
    }
}

async fn load_items(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartItem>> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!("SELECT {ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY position"))
        .bind(cart_id).fetch_all(&mut *conn).await?;
    rows.into_iter().map(CartItem::try_from).collect()
}

async fn load_cart(conn: &mut PgConnection, cart_id: Uuid) -> Result<Option<Cart>> {
    let row = sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1"))
        .bind(cart_id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => {
            let items = load_items(conn, row.id).await?;
            Ok(Some(row.into_cart(items)?))
        }
        None => Ok(None),
    }
}

fn stored_quantity(q: Quantity) -> i64 { i64::from(q.value()) }

/// Attaches lines to their carts, keeping row order. Carts without lines come back empty.
fn group_items(carts: Vec<CartRow>, rows: Vec<ItemRow>) -> Result<Vec<Cart>> {
    let mut items: HashMap<Uuid, Vec<CartItem>> = HashMap::new();
    for row in rows {
        let cart_id = row.cart_id;
        items.entry(cart_id).or_default().push(CartItem::try_from(row)?);
    }
    carts.into_iter().map(|c| { let lines = items.remove(&c.id).unwrap_or_default(); c.into_cart(lines) }).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find_active_cart(&self, user_id: &UserId) -> Result<Option<Cart>> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 AND status = 'active'"))
            .bind(user_id.as_str()).fetch_optional(&mut *conn).await?;
        match row {
            Some(row) => {
                let items = load_items(&mut *conn, row.id).await?;
                Ok(Some(row.into_cart(items)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, cart: Cart) -> Result<Cart> {
        let mut tx = self.pool.begin().await?;
        let cart_id = match cart.id {
            None => {
                let id = Uuid::now_v7();
                sqlx::query("INSERT INTO carts (id, user_id, status, version, created_at, updated_at) VALUES ($1, $2, $3, 1, $4, $5)")
                    .bind(id).bind(cart.user_id.as_str()).bind(cart.status.as_str()).bind(cart.created_at).bind(cart.updated_at)
                    .execute(&mut *tx).await.map_err(map_write_error)?;
                id
            }
            Some(id) => {
                let updated: Option<Uuid> = sqlx::query_scalar(
                    "UPDATE carts SET status = $3, updated_at = $4, version = version + 1 WHERE id = $1 AND version = $2 RETURNING id")
                    .bind(id).bind(cart.version).bind(cart.status.as_str()).bind(cart.updated_at)
                    .fetch_optional(&mut *tx).await.map_err(map_write_error)?;
                updated.ok_or(PersistenceError::Conflict)?
            }
        };

        let kept: Vec<String> = cart.items.iter().map(|i| i.product_id.as_str().to_string()).collect();
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND NOT (product_id = ANY($2))")
            .bind(cart_id).bind(kept).execute(&mut *tx).await?;
        for item in &cart.items {
            sqlx::query(&format!("INSERT INTO cart_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (cart_id, product_id) DO UPDATE SET product = EXCLUDED.product, quantity = EXCLUDED.quantity, added_at = EXCLUDED.added_at"))
                .bind(cart_id).bind(item.product_id.as_str()).bind(Json(&item.product)).bind(stored_quantity(item.quantity)).bind(item.added_at)
                .execute(&mut *tx).await.map_err(map_write_error)?;
        }

        let saved = load_cart(&mut *tx, cart_id).await?.ok_or_else(|| corrupt(format!("cart {cart_id} vanished during save")))?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn merge_item(&self, user_id: &UserId, line: NewLine) -> Result<Cart> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        // Find-or-create; the DO UPDATE row lock serializes merges for this user until commit.
        let cart_id: Uuid = sqlx::query_scalar(
            "INSERT INTO carts (id, user_id, status, version, created_at, updated_at) VALUES ($1, $2, 'active', 1, $3, $3) \
             ON CONFLICT (user_id) WHERE status = 'active' \
             DO UPDATE SET updated_at = EXCLUDED.updated_at, version = carts.version + 1 \
             RETURNING id")
            .bind(Uuid::now_v7()).bind(user_id.as_str()).bind(now)
            .fetch_one(&mut *tx).await.map_err(map_write_error)?;

        sqlx::query(&format!("INSERT INTO cart_items ({ITEM_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, product = EXCLUDED.product"))
            .bind(cart_id).bind(line.product_id.as_str()).bind(Json(&line.snapshot)).bind(stored_quantity(line.quantity)).bind(now)
            .execute(&mut *tx).await.map_err(map_write_error)?;

        let cart = load_cart(&mut *tx, cart_id).await?.ok_or_else(|| corrupt(format!("cart {cart_id} vanished during merge")))?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn list_all(&self) -> Result<Vec<Cart>> {
        // Both reads see one snapshot, so every cart comes back with exactly its own lines.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY").execute(&mut *tx).await?;
        let carts = sqlx::query_as::<_, CartRow>(&format!("SELECT {CART_COLUMNS} FROM carts ORDER BY created_at"))
            .fetch_all(&mut *tx).await?;
        let rows = sqlx::query_as::<_, ItemRow>(&format!("SELECT {ITEM_COLUMNS} FROM cart_items ORDER BY position"))
            .fetch_all(&mut *tx).await?;
        tx.commit().await?;
        group_items(carts, rows)
    }
}

#[async_trait]
impl CatalogLookup for PgStore {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_str()).fetch_optional(&self.pool).await?;
        row.map(Product::try_from).transpose()
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        if ids.is_empty() { return Ok(HashMap::new()); }
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(keys).fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| Product::try_from(r).map(|p| (p.id.clone(), p))).collect()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_emails(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>> {
        if ids.is_empty() { return Ok(HashMap::new()); }
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT id, email FROM users WHERE id = ANY($1)")
            .bind(keys).fetch_all(&self.pool).await?;
        rows.into_iter().map(|(id, email)| -> Result<(UserId, String)> { Ok((UserId::new(id).map_err(corrupt)?, email)) }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    #[derive(Debug)]
    struct CodedError(&'static str);

    impl std::fmt::Display for CodedError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "database error {}", self.0) }
    }
    impl std::error::Error for CodedError {}

    impl DatabaseError for CodedError {
        fn message(&self) -> &str { "database error" }
        fn code(&self) -> Option<Cow<'_, str>> { Some(Cow::Borrowed(self.0)) }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) { self }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) { self }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> { self }
        fn kind(&self) -> ErrorKind { ErrorKind::Other }
    }

    fn db_error(code: &'static str) -> sqlx::Error { sqlx::Error::Database(Box::new(CodedError(code))) }

    fn cart_row(id: Uuid, status: &str) -> CartRow {
        CartRow { id, user_id: "u1".into(), status: status.into(), version: 3, created_at: Utc::now(), updated_at: Utc::now() }
    }

    fn item_row(cart_id: Uuid, product_id: &str, quantity: i64) -> ItemRow {
        ItemRow { cart_id, product_id: product_id.into(), product: Json(ProductSnapshot::default()), quantity, added_at: Utc::now() }
    }

    #[test]
    fn test_write_errors_by_sqlstate() {
        assert!(matches!(map_write_error(db_error("23505")), CartError::Persistence(PersistenceError::Conflict)));
        assert!(matches!(map_write_error(db_error("23514")), CartError::Validation(_)));
        assert!(matches!(map_write_error(db_error("08006")), CartError::Persistence(PersistenceError::Unavailable(_))));
        assert!(matches!(map_write_error(sqlx::Error::PoolTimedOut), CartError::Persistence(PersistenceError::Unavailable(_))));
    }

    #[test]
    fn test_item_row_quantity_bounds() {
        let id = Uuid::now_v7();
        let item = CartItem::try_from(item_row(id, "P1", 4)).unwrap();
        assert_eq!(item.quantity.value(), 4);
        assert_eq!(CartItem::try_from(item_row(id, "P1", i64::from(u32::MAX))).unwrap().quantity.value(), u32::MAX);
        for bad in [0, -1, i64::from(u32::MAX) + 1] {
            assert!(matches!(CartItem::try_from(item_row(id, "P1", bad)), Err(CartError::Persistence(PersistenceError::Corrupt(_)))));
        }
        assert!(matches!(CartItem::try_from(item_row(id, "  ", 1)), Err(CartError::Persistence(PersistenceError::Corrupt(_)))));
    }

    #[test]
    fn test_cart_row_status() {
        let id = Uuid::now_v7();
        let cart = cart_row(id, "completed").into_cart(vec![]).unwrap();
        assert_eq!(cart.status, CartStatus::Completed);
        assert_eq!(cart.id, Some(id));
        assert_eq!(cart.version, 3);
        assert!(matches!(cart_row(id, "lost").into_cart(vec![]), Err(CartError::Persistence(PersistenceError::Corrupt(_)))));
    }

    #[test]
    fn test_product_row() {
        let row = ProductRow {
            id: "P1".into(), name: None, title: Some("Lamp".into()), price: Decimal::new(995, 2), description: None,
            category: None, brand: None, stock: 12, thumbnail: None, images: vec!["a.png".into()],
            rating: Some(4.0), discount_percentage: None, created_at: Utc::now(),
        };
        let product = Product::try_from(row).unwrap();
        assert_eq!(product.id.as_str(), "P1");
        assert_eq!(product.stock, 12);
        assert_eq!(product.display_name(), Some("Lamp"));
    }

    #[test]
    fn test_group_items_keeps_lines_with_their_cart() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let rows = vec![item_row(a, "P1", 1), item_row(b, "P9", 2), item_row(a, "P2", 3), item_row(Uuid::now_v7(), "P5", 1)];
        let carts = group_items(vec![cart_row(a, "active"), cart_row(b, "abandoned")], rows).unwrap();
        let ids = |c: &Cart| c.items.iter().map(|i| i.product_id.as_str().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&carts[0]), vec!["P1", "P2"]);
        assert_eq!(ids(&carts[1]), vec!["P9"]);
        assert!(group_items(vec![cart_row(a, "active")], vec![]).unwrap()[0].items.is_empty());
    }
}
