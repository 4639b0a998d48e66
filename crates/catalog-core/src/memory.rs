//! In-memory [`ProductStore`] for tests. Counts mutating calls so callers
//! can assert that a rejected operation never reached the write path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::products::{NewProduct, ProductKey, ProductRecord, ProductUpdate};
use crate::store::{InsertResult, ProductStore, StoreError, UpdateResult};

#[derive(Debug, Default)]
pub struct MemoryProductStore {
    rows: Mutex<Vec<ProductRecord>>,
    insert_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    hide_from_lookups: AtomicBool,
    fail_next: AtomicBool,
}

impl MemoryProductStore {
    fn rows(&self) -> MutexGuard<'_, Vec<ProductRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::new(std::io::Error::other(
                "injected store failure",
            )));
        }
        Ok(())
    }

    /// Insert a row directly, bypassing call counting and SKU checks.
    pub fn seed(&self, product: NewProduct) -> ProductRecord {
        let now = Utc::now();
        let record = ProductRecord {
            id: Uuid::new_v4(),
            sku: product.sku,
            name: product.name,
            price: product.price,
            description: product.description,
            image: product.image,
            created_at: now,
            updated_at: now,
        };
        self.rows().push(record.clone());
        record
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<ProductRecord> {
        self.rows().iter().find(|r| r.id == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Make `find` miss every row, simulating a concurrent writer that lands
    /// between a lookup and the following write.
    pub fn hide_from_lookups(&self, hide: bool) {
        self.hide_from_lookups.store(hide, Ordering::SeqCst);
    }

    /// The next store call returns a [`StoreError`].
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

fn matches_key(record: &ProductRecord, key: &ProductKey) -> bool {
    match key {
        ProductKey::Id(id) => record.id == *id,
        ProductKey::Sku(sku) => record.sku.as_deref() == Some(sku.as_str()),
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_failure()
    }

    async fn find(&self, key: &ProductKey) -> Result<Option<ProductRecord>, StoreError> {
        self.check_failure()?;
        if self.hide_from_lookups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.rows().iter().find(|r| matches_key(r, key)).cloned())
    }

    async fn list(&self) -> Result<Vec<ProductRecord>, StoreError> {
        self.check_failure()?;
        let mut rows = self.rows().clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn insert(&self, product: &NewProduct) -> Result<InsertResult, StoreError> {
        self.check_failure()?;
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(sku) = &product.sku {
            if self
                .rows()
                .iter()
                .any(|r| r.sku.as_deref() == Some(sku.as_str()))
            {
                return Ok(InsertResult::DuplicateSku);
            }
        }

        Ok(InsertResult::Inserted(self.seed(product.clone())))
    }

    async fn update(&self, update: &ProductUpdate) -> Result<UpdateResult, StoreError> {
        self.check_failure()?;
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows();
        if let Some(sku) = &update.sku {
            if rows
                .iter()
                .any(|r| r.id != update.id && r.sku.as_deref() == Some(sku.as_str()))
            {
                return Ok(UpdateResult::DuplicateSku);
            }
        }

        let Some(row) = rows.iter_mut().find(|r| r.id == update.id) else {
            return Ok(UpdateResult::Missing);
        };
        row.sku.clone_from(&update.sku);
        row.name.clone_from(&update.name);
        row.price = update.price;
        row.description.clone_from(&update.description);
        if let Some(image) = &update.image {
            row.image = Some(image.clone());
        }
        row.updated_at = Utc::now();
        Ok(UpdateResult::Updated(row.clone()))
    }

    async fn delete(&self, key: &ProductKey) -> Result<bool, StoreError> {
        self.check_failure()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|r| !matches_key(r, key));
        Ok(rows.len() < before)
    }
}
