//! Storefront Cart
//!
//! Per-user shopping cart backed by a document-style store, copying product
//! display data out of a separately owned catalog.
//!
//! ## Features
//! - Merge-on-add cart lines keyed by product
//! - Point-in-time product snapshots (caller supplied or catalog derived)
//! - One active cart per user, enforced by find-or-create in the store
//! - Atomic item upsert and optimistic saves against PostgreSQL
//! - Cart events on NATS

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod events;
pub mod repository;
pub mod service;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CartError {
    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Item not found in cart")]
    ItemNotFound,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Cart was modified concurrently")]
    Conflict,

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self { CartError::Persistence(PersistenceError::Unavailable(e.to_string())) }
}

pub type Result<T> = std::result::Result<T, CartError>;
