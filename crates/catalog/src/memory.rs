use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::ProductId;
use tokio::sync::RwLock;

use crate::{Category, CatalogError, CatalogStore, NewProduct, Product, Result};

#[derive(Default)]
struct CatalogState {
    categories: HashMap<i64, Category>,
    products: HashMap<ProductId, Product>,
    next_category_id: i64,
    next_product_id: i64,
}

/// In-memory catalog implementation for testing and local runs.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).cloned())
    }

    async fn list_products(&self, category_id: i64) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| p.category_id == category_id && p.active)
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by_key(|c| c.id);
        Ok(categories)
    }

    async fn add_category(&self, name: &str) -> Result<Category> {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidProduct(
                "category name must not be empty".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        state.next_category_id += 1;
        let category = Category {
            id: state.next_category_id,
            name: name.to_string(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.validate().map_err(CatalogError::InvalidProduct)?;

        let mut state = self.state.write().await;
        if !state.categories.contains_key(&product.category_id) {
            return Err(CatalogError::CategoryNotFound(product.category_id));
        }

        state.next_product_id += 1;
        let stored = Product {
            id: ProductId::new(state.next_product_id),
            category_id: product.category_id,
            name: product.name,
            description: product.description,
            price: product.price,
            payload: product.payload,
            active: true,
            created_at: Utc::now(),
        };
        state.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn deactivate_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                product.active = false;
                Ok(())
            }
            None => Err(CatalogError::ProductNotFound(id)),
        }
    }
}
