//! Database operations for the `products` table.

use async_trait::async_trait;
use catalog_core::{
    InsertResult, NewProduct, ProductKey, ProductRecord, ProductStore, ProductUpdate, StoreError,
    UpdateResult,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, description, image, created_at, updated_at";

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    /// Unique when present (`products_sku_key`).
    pub sku: Option<String>,
    pub name: String,
    /// `NUMERIC(10,2)`.
    pub price: Decimal,
    pub description: Option<String>,
    /// File name inside the configured upload directory.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            price: row.price,
            description: row.description,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every product ordered by name, then id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &PgPool) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a product by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a product by SKU, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_sku(pool: &PgPool, sku: &str) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"
    ))
    .bind(sku)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a product and returns the new row.
///
/// Returns `None` when the SKU is already taken. The conflict is resolved by
/// the `products_sku_key` constraint inside the same statement, so two
/// concurrent inserts of one SKU cannot both succeed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn insert_product(
    pool: &PgPool,
    product: &NewProduct,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (sku, name, price, description, image) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (sku) DO NOTHING \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(product.sku.as_deref())
    .bind(&product.name)
    .bind(product.price)
    .bind(product.description.as_deref())
    .bind(product.image.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Overwrites `sku`, `name`, `price` and `description`; `image` is kept
/// unless a new file name is supplied.
///
/// Returns `None` if no row has `update.id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails, including a
/// `unique_violation` when the new SKU belongs to another product.
pub async fn update_product(
    pool: &PgPool,
    update: &ProductUpdate,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             sku         = $2, \
             name        = $3, \
             price       = $4, \
             description = $5, \
             image       = COALESCE($6, image), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(update.id)
    .bind(update.sku.as_deref())
    .bind(&update.name)
    .bind(update.price)
    .bind(update.description.as_deref())
    .bind(update.image.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes the product matching `key`. Returns whether a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, key: &ProductKey) -> Result<bool, DbError> {
    let result = match key {
        ProductKey::Id(id) => {
            sqlx::query("DELETE FROM products WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await?
        }
        ProductKey::Sku(sku) => {
            sqlx::query("DELETE FROM products WHERE sku = $1")
                .bind(sku)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

fn is_unique_violation(err: &DbError) -> bool {
    if let DbError::Sqlx(sqlx::Error::Database(db_err)) = err {
        db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    } else {
        false
    }
}

// ---------------------------------------------------------------------------
// ProductStore implementation
// ---------------------------------------------------------------------------

/// [`ProductStore`] backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::ping(&self.pool)
            .await
            .map_err(|e| DbError::from(e).into())
    }

    async fn find(&self, key: &ProductKey) -> Result<Option<ProductRecord>, StoreError> {
        let row = match key {
            ProductKey::Id(id) => get_product_by_id(&self.pool, *id).await?,
            ProductKey::Sku(sku) => get_product_by_sku(&self.pool, sku).await?,
        };
        Ok(row.map(ProductRecord::from))
    }

    async fn list(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let rows = list_products(&self.pool).await?;
        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn insert(&self, product: &NewProduct) -> Result<InsertResult, StoreError> {
        match insert_product(&self.pool, product).await? {
            Some(row) => Ok(InsertResult::Inserted(row.into())),
            None => Ok(InsertResult::DuplicateSku),
        }
    }

    async fn update(&self, update: &ProductUpdate) -> Result<UpdateResult, StoreError> {
        match update_product(&self.pool, update).await {
            Ok(Some(row)) => Ok(UpdateResult::Updated(row.into())),
            Ok(None) => Ok(UpdateResult::Missing),
            Err(e) if is_unique_violation(&e) => Ok(UpdateResult::DuplicateSku),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &ProductKey) -> Result<bool, StoreError> {
        Ok(delete_product(&self.pool, key).await?)
    }
}
