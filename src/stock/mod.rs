//! Write-through stock cache.
//!
//! One signed counter per product lives under `stock:{id}` in the key-value
//! service. It is filled lazily from the durable store (or in bulk at
//! startup), mutated only through increments, and written back to the store
//! by [`StockCache::sync_to_store`].
//!
//! The counter primitive is atomic per increment, but `deduct` is a
//! read-compare-decrement sequence. It is only safe against oversell while the
//! caller holds the product lock from [`crate::lock::LockManager`].

mod error;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use crate::domain::ProductId;
use crate::kv::{stock_key, KvStore};
use crate::store::DurableStore;

pub use error::*;

/// Result of a stock deduction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeductOutcome {
    Deducted { remaining: u64 },
    /// No cached entry. The caller must resync; nothing was deducted.
    NotFound,
    /// Not enough units. Nothing was deducted.
    Insufficient { available: u64 },
}

#[derive(Clone)]
pub struct StockCache {
    kv: Arc<dyn KvStore>,
    store: Arc<dyn DurableStore>,
    ttl: Duration,
}

impl StockCache {
    pub fn new(kv: Arc<dyn KvStore>, store: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self { kv, store, ttl }
    }

    /// Overwrites the cached quantity and resets its expiry.
    ///
    /// Clobbers any in-flight value, so hold the product lock if other
    /// mutators may be running.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn initialize(&self, product_id: ProductId, quantity: u64) -> Result<(), StockError> {
        let value = i64::try_from(quantity).map_err(|_| StockError::InvalidQuantity(quantity))?;
        self.kv.set(&stock_key(product_id), value, Some(self.ttl)).await?;
        debug!(quantity, "Stock cached");
        Ok(())
    }

    /// Cached quantity, reloading from the durable store on a miss.
    /// `None` if the product has no durable record.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get(&self, product_id: ProductId) -> Result<Option<u64>, StockError> {
        if let Some(quantity) = self.cached(product_id).await? {
            return Ok(Some(quantity));
        }
        debug!("Cache miss, loading from store");
        match self.sync_from_store(product_id).await {
            Ok(quantity) => Ok(Some(quantity)),
            Err(StockError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Cached quantity without touching the durable store.
    pub async fn cached(&self, product_id: ProductId) -> Result<Option<u64>, StockError> {
        match self.kv.get(&stock_key(product_id)).await? {
            None => Ok(None),
            Some(value) => u64::try_from(value)
                .map(Some)
                .map_err(|_| StockError::CorruptCounter { product_id, value }),
        }
    }

    /// Checks and decrements the cached quantity.
    ///
    /// Never reloads: a missing entry is reported as [`DeductOutcome::NotFound`]
    /// so a deduction can never be applied against stale data.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn deduct(&self, product_id: ProductId, amount: u64) -> Result<DeductOutcome, StockError> {
        let delta = positive_delta(amount)?;
        let key = stock_key(product_id);

        let Some(current) = self.kv.get(&key).await? else {
            debug!("No cached stock to deduct from");
            return Ok(DeductOutcome::NotFound);
        };
        if current < delta {
            debug!(current, amount, "Insufficient stock");
            return Ok(DeductOutcome::Insufficient { available: current.max(0) as u64 });
        }

        let Some(remaining) = self.kv.incr_by_if_exists(&key, -delta).await? else {
            debug!("Cached stock expired before the decrement");
            return Ok(DeductOutcome::NotFound);
        };
        if remaining < 0 {
            // Another writer got in between the read and the decrement.
            let Some(restored) = self.kv.incr_by_if_exists(&key, delta).await? else {
                warn!(remaining, "Cached stock expired during rollback");
                return Ok(DeductOutcome::NotFound);
            };
            warn!(remaining, restored, "Deduction raced below zero, rolled back");
            return Ok(DeductOutcome::Insufficient { available: restored.max(0) as u64 });
        }

        self.kv.expire(&key, self.ttl).await?;
        debug!(remaining, "Stock deducted");
        Ok(DeductOutcome::Deducted { remaining: remaining as u64 })
    }

    /// Adds units (restock or compensation) and returns the new quantity.
    ///
    /// An evicted entry is reloaded from the durable store first, so the
    /// increment lands on the committed count rather than on zero.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: ProductId, amount: u64) -> Result<u64, StockError> {
        let delta = positive_delta(amount)?;
        let key = stock_key(product_id);

        let value = match self.kv.incr_by_if_exists(&key, delta).await? {
            Some(value) => value,
            None => {
                debug!("Cache miss, loading from store before adding");
                self.sync_from_store(product_id).await?;
                self.kv.incr_by_if_exists(&key, delta).await?
                    .ok_or(StockError::NotFound(product_id))?
            }
        };
        self.kv.expire(&key, self.ttl).await?;
        debug!(quantity = value, "Stock added");
        u64::try_from(value).map_err(|_| StockError::CorruptCounter { product_id, value })
    }

    /// Replaces the cached quantity with the committed one.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn sync_from_store(&self, product_id: ProductId) -> Result<u64, StockError> {
        let quantity = self.store.find_stock(product_id).await?
            .ok_or(StockError::NotFound(product_id))?;
        self.initialize(product_id, u64::from(quantity)).await?;
        Ok(u64::from(quantity))
    }

    /// Commits the cached quantity to the durable store. Returns the committed
    /// value, or `None` without writing if nothing is cached.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn sync_to_store(&self, product_id: ProductId) -> Result<Option<u64>, StockError> {
        let Some(quantity) = self.cached(product_id).await? else {
            debug!("Nothing cached, skipping write-through");
            return Ok(None);
        };
        let committed = u32::try_from(quantity).map_err(|_| StockError::CorruptCounter {
            product_id,
            value: quantity as i64,
        })?;
        self.store.save_stock(product_id, committed).await?;
        debug!(quantity, "Stock written through");
        Ok(Some(quantity))
    }

    /// Evicts the cached entry.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete(&self, product_id: ProductId) -> Result<bool, StockError> {
        Ok(self.kv.delete(&stock_key(product_id)).await?)
    }

    /// Caches many quantities in one round trip. Returns how many were written.
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn batch_initialize(&self, entries: Vec<(ProductId, u64)>) -> Result<usize, StockError> {
        let entries = entries.into_iter()
            .map(|(product_id, quantity)| {
                i64::try_from(quantity)
                    .map(|value| (stock_key(product_id), value))
                    .map_err(|_| StockError::InvalidQuantity(quantity))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let count = entries.len();
        self.kv.set_batch(entries, Some(self.ttl)).await?;
        Ok(count)
    }

    /// Loads every committed stock level into the cache. Run once before the
    /// service takes traffic so early requests do not all miss at once.
    #[instrument(skip(self))]
    pub async fn warm_up(&self) -> Result<usize, StockError> {
        let snapshot = self.store.stock_snapshot().await?;
        let entries = snapshot.into_iter()
            .map(|(product_id, quantity)| (product_id, u64::from(quantity)))
            .collect();
        let count = self.batch_initialize(entries).await?;
        info!(count, "Stock cache warmed up");
        Ok(count)
    }

    /// Whether at least `quantity` units are available. Unknown products have none.
    pub async fn is_sufficient(&self, product_id: ProductId, quantity: u64) -> Result<bool, StockError> {
        Ok(self.get(product_id).await?.is_some_and(|available| available >= quantity))
    }
}

fn positive_delta(amount: u64) -> Result<i64, StockError> {
    match i64::try_from(amount) {
        Ok(delta) if delta > 0 => Ok(delta),
        _ => Err(StockError::InvalidQuantity(amount)),
    }
}
