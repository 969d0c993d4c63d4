use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{Category, CatalogError, CatalogStore, NewProduct, Product, ProductKind, ProductPayload, Result};

/// PostgreSQL-backed catalog implementation.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new PostgreSQL catalog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let kind_str: String = row.try_get("kind")?;
        let kind = ProductKind::parse(&kind_str).ok_or_else(|| {
            CatalogError::InvalidProduct(format!("unknown product kind {kind_str:?} in storage"))
        })?;
        let payload_str: String = row.try_get("payload")?;
        let payload = match kind {
            ProductKind::Text => ProductPayload::Text(payload_str),
            ProductKind::File => ProductPayload::FileRef(payload_str),
        };

        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            category_id: row.try_get("category_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            payload,
            active: row.try_get("active")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price_cents, kind, payload, active, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self, category_id: i64) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, category_id, name, description, price_cents, kind, payload, active, created_at
            FROM products
            WHERE category_id = $1 AND active
            ORDER BY id ASC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Category {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn add_category(&self, name: &str) -> Result<Category> {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidProduct(
                "category name must not be empty".to_string(),
            ));
        }

        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }

    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    async fn add_product(&self, product: NewProduct) -> Result<Product> {
        product.validate().map_err(CatalogError::InvalidProduct)?;

        let row = sqlx::query(
            r#"
            INSERT INTO products (category_id, name, description, price_cents, kind, payload, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7)
            RETURNING id, category_id, name, description, price_cents, kind, payload, active, created_at
            "#,
        )
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.payload.kind().as_str())
        .bind(product.payload.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("products_category_id_fkey")
            {
                return CatalogError::CategoryNotFound(product.category_id);
            }
            CatalogError::Database(e)
        })?;

        Self::row_to_product(row)
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("UPDATE products SET active = FALSE WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::ProductNotFound(id));
        }
        Ok(())
    }
}
