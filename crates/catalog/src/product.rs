//! Catalog data model.

use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A product grouping shown to buyers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Kind of digital good a product delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// The payload is the secret text itself.
    Text,
    /// The payload is a reference to stored file content.
    File,
}

impl ProductKind {
    /// Returns the storage representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Text => "text",
            ProductKind::File => "file",
        }
    }

    /// Parses the storage representation back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(ProductKind::Text),
            "file" => Some(ProductKind::File),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content delivered to the buyer after a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductPayload {
    /// Inline secret text.
    Text(String),
    /// Opaque reference to file content held by the delivery channel.
    FileRef(String),
}

impl ProductPayload {
    /// Returns the kind of good this payload represents.
    pub fn kind(&self) -> ProductKind {
        match self {
            ProductPayload::Text(_) => ProductKind::Text,
            ProductPayload::FileRef(_) => ProductKind::File,
        }
    }

    /// Returns the raw payload string.
    pub fn as_str(&self) -> &str {
        match self {
            ProductPayload::Text(s) | ProductPayload::FileRef(s) => s,
        }
    }
}

/// A digital product offered for sale.
///
/// Payments snapshot `price` at invoice-creation time, so editing a price
/// here never retroactively changes an issued invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub payload: ProductPayload,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub payload: ProductPayload,
}

impl NewProduct {
    /// Validates the input, returning a message describing the problem.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if !self.price.is_positive() {
            return Err("price must be positive".to_string());
        }
        if self.payload.as_str().is_empty() {
            return Err("payload must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewProduct {
        NewProduct {
            category_id: 1,
            name: "VPN access".to_string(),
            description: "1 month".to_string(),
            price: Money::from_cents(999),
            payload: ProductPayload::Text("key-abc".to_string()),
        }
    }

    #[test]
    fn kind_string_roundtrip() {
        assert_eq!(ProductKind::parse("text"), Some(ProductKind::Text));
        assert_eq!(ProductKind::parse("file"), Some(ProductKind::File));
        assert_eq!(ProductKind::parse("video"), None);
        assert_eq!(ProductKind::File.as_str(), "file");
    }

    #[test]
    fn payload_kind_matches_variant() {
        assert_eq!(
            ProductPayload::Text("s".into()).kind(),
            ProductKind::Text
        );
        assert_eq!(
            ProductPayload::FileRef("f".into()).kind(),
            ProductKind::File
        );
    }

    #[test]
    fn validate_accepts_good_input() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_name() {
        let mut p = sample();
        p.name = "  ".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_price() {
        let mut p = sample();
        p.price = Money::zero();
        assert!(p.validate().is_err());
    }
}
