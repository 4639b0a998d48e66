//! The data-access seam between the catalog rules and a concrete database.

use async_trait::async_trait;
use thiserror::Error;

use crate::products::{NewProduct, ProductKey, ProductRecord, ProductUpdate};

/// Infrastructure failure reported by a [`ProductStore`]. Never a business
/// outcome: duplicates and missing rows are expressed in the return types.
#[derive(Debug, Error)]
#[error("product store failure: {0}")]
pub struct StoreError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertResult {
    Inserted(ProductRecord),
    /// A non-null SKU collided with an existing row at write time.
    DuplicateSku,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    Updated(ProductRecord),
    /// The row disappeared between lookup and write.
    Missing,
    /// The new SKU belongs to another product.
    DuplicateSku,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find(&self, key: &ProductKey) -> Result<Option<ProductRecord>, StoreError>;

    /// All products, ordered by name then id.
    async fn list(&self) -> Result<Vec<ProductRecord>, StoreError>;

    async fn insert(&self, product: &NewProduct) -> Result<InsertResult, StoreError>;

    async fn update(&self, update: &ProductUpdate) -> Result<UpdateResult, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, key: &ProductKey) -> Result<bool, StoreError>;
}
