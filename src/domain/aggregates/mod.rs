//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{Product, ProductSnapshot, ProductSummary, SnapshotError, SnapshotOrigin};
pub use cart::{apply, Cart, CartCommand, CartItem, CartStatus};
