use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};
use crate::checkout::CheckoutService;
use crate::config::InventoryConfig;
use crate::domain::{Account, Product, ProductId};
use crate::kv::{product_lock_key, KvActor, KvClient, KvStore};
use crate::lock::{LeaseTime, LockManager};
use crate::stock::StockCache;
use crate::store::{DurableStore, MemoryStore};
use super::SystemError;

/// The running inventory core: key-value service, durable store, and the
/// services wired on top of them.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct InventorySystem {
    pub checkout: CheckoutService,
    pub stock: StockCache,
    pub locks: LockManager,
    pub store: MemoryStore,
    kv: KvClient,
    config: InventoryConfig,
    handles: Vec<JoinHandle<()>>,
}

impl InventorySystem {
    pub fn new(config: &InventoryConfig) -> Self {
        // 1. Key-value service holding cached counters and locks
        let (kv_actor, kv) = KvActor::new(config.mailbox_size);
        let kv_handle = tokio::spawn(kv_actor.run());

        // 2. Durable store: products, accounts, carts
        let (store, mut handles) = MemoryStore::spawn(config.mailbox_size);
        handles.push(kv_handle);

        // 3. Services
        let kv_store: Arc<dyn KvStore> = Arc::new(kv.clone());
        let durable: Arc<dyn DurableStore> = Arc::new(store.clone());
        let locks = LockManager::new(kv_store.clone(), config.watchdog_timeout, config.lock_retry_interval);
        let stock = StockCache::new(kv_store, durable.clone(), config.stock_ttl);
        let checkout = CheckoutService::new(locks.clone(), stock.clone(), durable, config.lock_wait);

        Self {
            checkout,
            stock,
            locks,
            store,
            kv,
            config: config.clone(),
            handles,
        }
    }

    /// Loads every committed stock level into the cache. Call before taking traffic.
    pub async fn warm_up(&self) -> Result<usize, SystemError> {
        Ok(self.stock.warm_up().await?)
    }

    /// Saves a product and resets its cached stock to the saved level.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn save_product(&self, product: Product) -> Result<(), SystemError> {
        let (product_id, quantity) = (product.id, u64::from(product.stock));
        self.locks.with_lock(&product_lock_key(product_id), self.config.lock_wait, LeaseTime::Watchdog, || async move {
            self.store.save_product(product).await?;
            self.stock.initialize(product_id, quantity).await?;
            info!(quantity, "Product saved");
            Ok::<_, SystemError>(())
        }).await
    }

    /// Deletes a product and evicts its cached stock. Returns `false` if it did not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn delete_product(&self, product_id: ProductId) -> Result<bool, SystemError> {
        self.locks.with_lock(&product_lock_key(product_id), self.config.lock_wait, LeaseTime::Watchdog, || async move {
            let deleted = self.store.delete_product(product_id).await?;
            self.stock.delete(product_id).await?;
            info!(deleted, "Product deleted");
            Ok::<_, SystemError>(deleted)
        }).await
    }

    pub async fn open_account(&self, account: Account) -> Result<(), SystemError> {
        Ok(self.store.open_account(account).await?)
    }

    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");
        self.store.shutdown().await;
        self.kv.shutdown().await;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(SystemError::ActorFailed(e.to_string()));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn catalog_changes_reach_the_cache() {
        let system = InventorySystem::new(&InventoryConfig::default());
        system.save_product(Product::new(1, "Lamp", dec!(30.00), 8)).await.unwrap();
        assert_eq!(system.stock.cached(ProductId(1)).await.unwrap(), Some(8));

        system.save_product(Product::new(1, "Lamp", dec!(30.00), 3)).await.unwrap();
        assert_eq!(system.stock.cached(ProductId(1)).await.unwrap(), Some(3));

        assert!(system.delete_product(ProductId(1)).await.unwrap());
        assert_eq!(system.stock.cached(ProductId(1)).await.unwrap(), None);
        assert!(!system.delete_product(ProductId(1)).await.unwrap());

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_products_are_not_cached() {
        let system = InventorySystem::new(&InventoryConfig::default());
        let result = system.save_product(Product::new(2, "", dec!(1.00), 5)).await;
        assert!(matches!(result, Err(SystemError::Store(_))));
        assert_eq!(system.stock.cached(ProductId(2)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn warm_up_loads_existing_products() {
        let system = InventorySystem::new(&InventoryConfig::default());
        system.store.save_product(Product::new(1, "Lamp", dec!(30.00), 8)).await.unwrap();
        system.store.save_product(Product::new(2, "Desk", dec!(120.00), 2)).await.unwrap();

        assert_eq!(system.warm_up().await.unwrap(), 2);
        assert_eq!(system.stock.cached(ProductId(2)).await.unwrap(), Some(2));
    }
}
