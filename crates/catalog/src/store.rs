//! Catalog store trait.

use async_trait::async_trait;
use common::ProductId;

use crate::{Category, NewProduct, Product, Result};

/// Storage interface for categories and products.
///
/// Implemented by [`crate::PostgresCatalog`] for production and
/// [`crate::InMemoryCatalog`] for tests and local runs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a product by id, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists active products in a category.
    async fn list_products(&self, category_id: i64) -> Result<Vec<Product>>;

    /// Lists all categories.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Creates a category with the given name.
    async fn add_category(&self, name: &str) -> Result<Category>;

    /// Creates a product after validating its input.
    async fn add_product(&self, product: NewProduct) -> Result<Product>;

    /// Marks a product inactive so it no longer shows up for sale.
    ///
    /// Existing payments referencing the product are unaffected.
    async fn deactivate_product(&self, id: ProductId) -> Result<()>;
}
