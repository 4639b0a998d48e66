//! Product business rules: SKU uniqueness on create, existence checks before
//! update and delete, and read normalization.
//!
//! Each rule is a lookup followed by a write in a separate round trip. The
//! store reports a lost race on the SKU constraint as
//! [`InsertResult::DuplicateSku`] / [`UpdateResult::DuplicateSku`], which maps
//! to the same soft failure as the pre-check.

use crate::products::{
    NewProduct, ProductKey, ProductUpdate, ProductView, WriteOutcome, MSG_DUPLICATE_SKU,
    MSG_NOT_FOUND, MSG_UPDATED,
};
use crate::store::{InsertResult, ProductStore, StoreError, UpdateResult};

/// Create a product unless its SKU is already taken.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached.
pub async fn create_product(
    store: &dyn ProductStore,
    product: &NewProduct,
) -> Result<WriteOutcome, StoreError> {
    if let Some(sku) = &product.sku {
        if store.find(&ProductKey::Sku(sku.clone())).await?.is_some() {
            tracing::info!(%sku, "create rejected: SKU already registered");
            return Ok(WriteOutcome::rejected(MSG_DUPLICATE_SKU));
        }
    }

    match store.insert(product).await? {
        InsertResult::Inserted(record) => {
            tracing::info!(id = %record.id, sku = ?record.sku, "product created");
            Ok(WriteOutcome::ok())
        }
        InsertResult::DuplicateSku => {
            tracing::warn!(sku = ?product.sku, "create lost SKU race to a concurrent insert");
            Ok(WriteOutcome::rejected(MSG_DUPLICATE_SKU))
        }
    }
}

/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached.
pub async fn list_products(store: &dyn ProductStore) -> Result<Vec<ProductView>, StoreError> {
    let rows = store.list().await?;
    Ok(rows.into_iter().map(ProductView::from).collect())
}

/// Look up one product. Absence is `None`, not an error.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached.
pub async fn get_product(
    store: &dyn ProductStore,
    key: &ProductKey,
) -> Result<Option<ProductView>, StoreError> {
    Ok(store.find(key).await?.map(ProductView::from))
}

/// Overwrite an existing product's fields; the image is replaced only when a
/// new one is supplied.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached.
pub async fn update_product(
    store: &dyn ProductStore,
    update: &ProductUpdate,
) -> Result<WriteOutcome, StoreError> {
    if store.find(&ProductKey::Id(update.id)).await?.is_none() {
        tracing::info!(id = %update.id, "update rejected: product not found");
        return Ok(WriteOutcome::rejected(MSG_NOT_FOUND));
    }

    match store.update(update).await? {
        UpdateResult::Updated(record) => {
            tracing::info!(
                id = %record.id,
                image_replaced = update.image.is_some(),
                "product updated"
            );
            Ok(WriteOutcome::ok_with(MSG_UPDATED))
        }
        UpdateResult::Missing => {
            tracing::warn!(id = %update.id, "product deleted before update was applied");
            Ok(WriteOutcome::rejected(MSG_NOT_FOUND))
        }
        UpdateResult::DuplicateSku => {
            tracing::info!(id = %update.id, sku = ?update.sku, "update rejected: SKU already registered");
            Ok(WriteOutcome::rejected(MSG_DUPLICATE_SKU))
        }
    }
}

/// Delete a product. Returns `false` without touching the store's delete
/// path when nothing matches `key`.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be reached.
pub async fn delete_product(store: &dyn ProductStore, key: &ProductKey) -> Result<bool, StoreError> {
    if store.find(key).await?.is_none() {
        tracing::info!(%key, "delete skipped: product not found");
        return Ok(false);
    }

    let removed = store.delete(key).await?;
    if removed {
        tracing::info!(%key, "product deleted");
    }
    Ok(removed)
}
