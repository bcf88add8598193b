//! Value Objects for the cart domain

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Verified owner of a cart, as yielded by the identity collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(IdError::Empty); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Catalog identity of a product; the key items are addressed by inside a cart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub const MAX_LEN: usize = 128;

    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(IdError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(IdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum IdError { Empty, TooLong }
impl std::error::Error for IdError {}
impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "identifier is empty"), Self::TooLong => write!(f, "identifier is too long") }
    }
}

/// Item quantity. Always at least 1; a line that would drop below 1 is not a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::NotPositive); }
        Ok(Self(value))
    }

    /// Coerces loosely typed request input into a quantity.
    ///
    /// Accepts JSON integers, floats (truncated toward zero) and numeric strings.
    /// Anything that does not yield an integer >= 1 is rejected rather than clamped.
    pub fn coerce(raw: &Value) -> Result<Self, QuantityError> {
        let parsed = match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i,
                None => match n.as_f64() {
                    Some(f) if f.is_finite() => f.trunc() as i64,
                    _ => return Err(QuantityError::NotANumber),
                },
            },
            Value::String(s) => parse_leading_integer(s).ok_or(QuantityError::NotANumber)?,
            _ => return Err(QuantityError::NotANumber),
        };
        if parsed < 1 { return Err(QuantityError::NotPositive); }
        let value = u32::try_from(parsed).map_err(|_| QuantityError::TooLarge)?;
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 { self.0 }

    pub fn checked_add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).map(Self).ok_or(QuantityError::TooLarge)
    }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Leading-integer parse: optional sign, then digits, trailing garbage ignored ("3 units" -> 3).
fn parse_leading_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { return None; }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotANumber, NotPositive, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "quantity must be a number"),
            Self::NotPositive => write!(f, "quantity must be at least 1"),
            Self::TooLarge => write!(f, "quantity is too large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_trimmed_and_non_empty() {
        assert_eq!(ProductId::new("  p-1 ").unwrap().as_str(), "p-1");
        assert_eq!(UserId::new("   "), Err(IdError::Empty));
        assert_eq!(ProductId::new("x".repeat(129)), Err(IdError::TooLong));
    }

    #[test]
    fn test_quantity_coercion() {
        assert_eq!(Quantity::coerce(&json!(3)).unwrap().value(), 3);
        assert_eq!(Quantity::coerce(&json!("4")).unwrap().value(), 4);
        assert_eq!(Quantity::coerce(&json!(" 2 pcs")).unwrap().value(), 2);
        assert_eq!(Quantity::coerce(&json!(2.9)).unwrap().value(), 2);
    }

    #[test]
    fn test_quantity_rejects_instead_of_clamping() {
        assert_eq!(Quantity::coerce(&json!(0)), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::coerce(&json!(-5)), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::coerce(&json!(0.5)), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::coerce(&json!("abc")), Err(QuantityError::NotANumber));
        assert_eq!(Quantity::coerce(&json!(null)), Err(QuantityError::NotANumber));
        assert_eq!(Quantity::coerce(&json!(true)), Err(QuantityError::NotANumber));
        assert_eq!(Quantity::coerce(&json!(5_000_000_000_i64)), Err(QuantityError::TooLarge));
    }

    #[test]
    fn test_quantity_add_overflow() {
        let big = Quantity::new(u32::MAX).unwrap();
        assert_eq!(big.checked_add(Quantity::ONE), Err(QuantityError::TooLarge));
        assert!(Quantity::new(0).is_err());
    }

    #[test]
    fn test_quantity_serde_rejects_zero() {
        assert!(serde_json::from_value::<Quantity>(json!(0)).is_err());
        assert_eq!(serde_json::to_value(Quantity::new(7).unwrap()).unwrap(), json!(7));
    }
}
