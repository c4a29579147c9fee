//! Product repository for `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use authentic_core::{Price, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::models::{Product, ProductFilter};

const PRODUCT_COLUMNS: &str =
    "id, name, category, price, image, description, count_in_stock, is_featured, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    category: String,
    price: Price,
    image: String,
    description: Option<String>,
    count_in_stock: i32,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let count_in_stock = u32::try_from(row.count_in_stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative stock {} for product {}",
                row.count_in_stock, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            image: row.image,
            description: row.description,
            count_in_stock,
            is_featured: row.is_featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn stock_column(count: u32) -> Result<i32, RepositoryError> {
    i32::try_from(count)
        .map_err(|_| RepositoryError::Conflict(format!("stock count {count} is out of range")))
}

/// Postgres-backed [`ProductRepository`].
#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE ($1::text IS NULL OR lower(category) = lower($1))
              AND ($2::boolean IS NULL OR is_featured = $2)
            ORDER BY created_at ASC
            "
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.category.as_deref().map(str::trim))
            .bind(filter.featured)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO products (id, name, category, price, image, description, count_in_stock, is_featured, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.image)
        .bind(&product.description)
        .bind(stock_column(product.count_in_stock)?)
        .bind(product.is_featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "product"))?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET name = $2, category = $3, price = $4, image = $5, description = $6,
                count_in_stock = $7, is_featured = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.image)
        .bind(&product.description)
        .bind(stock_column(product.count_in_stock)?)
        .bind(product.is_featured)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
