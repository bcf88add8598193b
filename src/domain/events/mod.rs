//! Domain events
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { cart_id: Option<Uuid>, user_id: UserId, product_id: ProductId, added: Quantity, quantity: Quantity, at: DateTime<Utc> },
    QuantityUpdated { cart_id: Option<Uuid>, user_id: UserId, product_id: ProductId, quantity: Quantity, at: DateTime<Utc> },
    ItemRemoved { cart_id: Option<Uuid>, user_id: UserId, product_id: ProductId, at: DateTime<Utc> },
    Cleared { cart_id: Option<Uuid>, user_id: UserId, at: DateTime<Utc> },
}

impl CartEvent {
    /// Subject suffix, e.g. `item_added`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item_added",
            Self::QuantityUpdated { .. } => "quantity_updated",
            Self::ItemRemoved { .. } => "item_removed",
            Self::Cleared { .. } => "cleared",
        }
    }

    pub fn subject(&self) -> String { format!("ecommerce.cart.{}", self.kind()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let e = CartEvent::Cleared { cart_id: None, user_id: UserId::new("u1").unwrap(), at: Utc::now() };
        assert_eq!(e.subject(), "ecommerce.cart.cleared");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "cleared");
        assert_eq!(v["user_id"], "u1");
    }
}
