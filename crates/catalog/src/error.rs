use thiserror::Error;

use common::ProductId;

/// Errors that can occur when interacting with the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The referenced category does not exist.
    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    /// A write was rejected because its input is invalid.
    #[error("Invalid product data: {0}")]
    InvalidProduct(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
