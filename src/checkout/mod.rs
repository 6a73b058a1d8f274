//! Checkout orchestration and the caller-facing inventory operations.
//!
//! Every stock mutation runs under the product lock and is written through to
//! the durable store before the lock is released. A checkout deducts its lines
//! one at a time, never holding two product locks at once, and restores the
//! lines it already deducted if a later step fails.

mod error;

use std::sync::Arc;
use std::time::Duration;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};
use crate::domain::{CartLine, ProductId, UserId};
use crate::kv::{checkout_lock_key, product_lock_key};
use crate::lock::{LeaseTime, LockManager};
use crate::stock::{DeductOutcome, StockCache, StockError};
use crate::store::DurableStore;

pub use error::*;

/// Totals of a user's cart at current durable prices.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub total_items: usize,
    pub total_quantity: u64,
    pub total_amount: Decimal,
}

/// A completed checkout. Stock, balance, and cart are all committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub total_charged: Decimal,
    pub remaining_balance: Decimal,
}

#[derive(Clone)]
pub struct CheckoutService {
    locks: LockManager,
    stock: StockCache,
    store: Arc<dyn DurableStore>,
    lock_wait: Duration,
}

impl CheckoutService {
    pub fn new(locks: LockManager, stock: StockCache, store: Arc<dyn DurableStore>, lock_wait: Duration) -> Self {
        Self {
            locks,
            stock,
            store,
            lock_wait,
        }
    }

    /// Adds units to a cart line after checking the cached stock covers the
    /// whole line, including what is already in the cart.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_to_cart(&self, user_id: UserId, product_id: ProductId, quantity: u32) -> Result<CartLine, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::InvalidQuantity);
        }
        self.locks.with_lock(&product_lock_key(product_id), self.lock_wait, LeaseTime::Watchdog, || async move {
            self.balance_of(user_id).await?;
            let in_cart = self.store.find_cart_lines(user_id).await?
                .iter()
                .find(|line| line.product_id == product_id)
                .map_or(0, |line| line.quantity);
            let wanted = in_cart.checked_add(quantity).ok_or(CheckoutError::InvalidQuantity)?;
            self.reserve_line(user_id, product_id, wanted).await
        }).await
    }

    /// Replaces the quantity of a cart line, checked against the cached stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_cart_quantity(&self, user_id: UserId, product_id: ProductId, quantity: u32) -> Result<CartLine, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::InvalidQuantity);
        }
        self.locks.with_lock(&product_lock_key(product_id), self.lock_wait, LeaseTime::Watchdog, || async move {
            self.balance_of(user_id).await?;
            self.reserve_line(user_id, product_id, quantity).await
        }).await
    }

    /// Drops a product from the cart. Touches no stock, so no lock is taken.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove_from_cart(&self, user_id: UserId, product_id: ProductId) -> Result<(), CheckoutError> {
        self.balance_of(user_id).await?;
        if !self.store.remove_cart_line(user_id, product_id).await? {
            return Err(CheckoutError::CartLineNotFound { user_id, product_id });
        }
        debug!("Cart line removed");
        Ok(())
    }

    /// Lines whose product no longer exists are left out of the totals.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cart_summary(&self, user_id: UserId) -> Result<CartSummary, CheckoutError> {
        self.balance_of(user_id).await?;
        let mut summary = CartSummary {
            user_id,
            lines: Vec::new(),
            total_items: 0,
            total_quantity: 0,
            total_amount: Decimal::ZERO,
        };
        for line in self.store.find_cart_lines(user_id).await? {
            let Some(product) = self.store.find_product(line.product_id).await? else {
                debug!(product_id = %line.product_id, "Skipping line of a deleted product");
                continue;
            };
            summary.total_items += 1;
            summary.total_quantity += u64::from(line.quantity);
            summary.total_amount += product.price * Decimal::from(line.quantity);
            summary.lines.push(line);
        }
        Ok(summary)
    }

    /// Locked, write-through deduction. Returns the remaining quantity.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn deduct_stock(&self, product_id: ProductId, quantity: u64) -> Result<u64, CheckoutError> {
        self.deduct_locked(product_id, quantity).await
    }

    /// Locked, write-through restock. Returns the new quantity.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn restock(&self, product_id: ProductId, quantity: u64) -> Result<u64, CheckoutError> {
        self.locks.with_lock(&product_lock_key(product_id), self.lock_wait, LeaseTime::Watchdog, || async move {
            let stock = self.stock.add(product_id, quantity).await?;
            self.stock.sync_to_store(product_id).await?;
            info!(quantity, stock, "Restocked");
            Ok::<_, CheckoutError>(stock)
        }).await
    }

    /// Charges the user for the whole cart and commits the stock deductions.
    ///
    /// Funds are checked before any stock moves. Lines are deducted in cart
    /// order, each under its own product lock. On failure every line already
    /// deducted is restored and the original error is returned.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CheckoutReceipt, CheckoutError> {
        self.locks.with_lock(&checkout_lock_key(user_id), self.lock_wait, LeaseTime::Watchdog, || {
            self.checkout_locked(user_id)
        }).await
    }

    async fn checkout_locked(&self, user_id: UserId) -> Result<CheckoutReceipt, CheckoutError> {
        let balance = self.balance_of(user_id).await?;
        let lines = self.store.find_cart_lines(user_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart(user_id));
        }

        let mut total = Decimal::ZERO;
        for line in &lines {
            let product = self.store.find_product(line.product_id).await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            total += product.price * Decimal::from(line.quantity);
        }
        if balance < total {
            warn!(%balance, %total, "Insufficient funds");
            return Err(CheckoutError::InsufficientFunds { balance, required: total });
        }

        let mut deducted = Vec::with_capacity(lines.len());
        for line in &lines {
            let quantity = u64::from(line.quantity);
            match self.deduct_locked(line.product_id, quantity).await {
                Ok(remaining) => {
                    debug!(product_id = %line.product_id, quantity, remaining, "Line committed");
                    deducted.push((line.product_id, quantity));
                }
                Err(e) => {
                    warn!(product_id = %line.product_id, error = %e, "Checkout line failed, rolling back");
                    self.compensate(&deducted).await;
                    return Err(e);
                }
            }
        }

        let remaining_balance = balance - total;
        if let Err(e) = self.store.save_user_balance(user_id, remaining_balance).await {
            error!(error = %e, "Failed to charge balance, rolling back");
            self.compensate(&deducted).await;
            return Err(e.into());
        }
        // The order is paid at this point. A stale cart is recoverable, a
        // reported failure would invite a second charge.
        if let Err(e) = self.store.clear_cart(user_id).await {
            error!(error = %e, "Checkout committed but the cart was not cleared");
        }

        info!(%total, %remaining_balance, lines = lines.len(), "Checkout completed");
        Ok(CheckoutReceipt {
            user_id,
            lines,
            total_charged: total,
            remaining_balance,
        })
    }

    async fn deduct_locked(&self, product_id: ProductId, quantity: u64) -> Result<u64, CheckoutError> {
        self.locks.with_lock(&product_lock_key(product_id), self.lock_wait, LeaseTime::Watchdog, || {
            self.deduct_and_commit(product_id, quantity)
        }).await
    }

    /// Must run under the product lock.
    async fn deduct_and_commit(&self, product_id: ProductId, quantity: u64) -> Result<u64, CheckoutError> {
        let mut outcome = self.stock.deduct(product_id, quantity).await?;
        if outcome == DeductOutcome::NotFound {
            // Evicted or expired. Under the lock the store holds the last
            // committed count, so resync once and retry.
            outcome = match self.stock.sync_from_store(product_id).await {
                Ok(_) => self.stock.deduct(product_id, quantity).await?,
                Err(StockError::NotFound(_)) => DeductOutcome::NotFound,
                Err(e) => return Err(e.into()),
            };
        }

        match outcome {
            DeductOutcome::Deducted { remaining } => {
                if let Err(e) = self.stock.sync_to_store(product_id).await {
                    if let Err(undo) = self.stock.add(product_id, quantity).await {
                        error!(%product_id, quantity, error = %undo, "Failed to undo an uncommitted deduction");
                    }
                    return Err(e.into());
                }
                Ok(remaining)
            }
            DeductOutcome::Insufficient { available } => Err(CheckoutError::OutOfStock {
                product_id,
                requested: quantity,
                available,
            }),
            DeductOutcome::NotFound => {
                error!(%product_id, "No stock record for a product being sold");
                Err(CheckoutError::StockDataInconsistent(product_id))
            }
        }
    }

    /// Restores deducted lines in reverse order. Failures are logged, never returned.
    async fn compensate(&self, deducted: &[(ProductId, u64)]) {
        for &(product_id, quantity) in deducted.iter().rev() {
            let restored = self.locks.with_lock(&product_lock_key(product_id), self.lock_wait, LeaseTime::Watchdog, || async move {
                let stock = self.stock.add(product_id, quantity).await?;
                self.stock.sync_to_store(product_id).await?;
                Ok::<_, CheckoutError>(stock)
            }).await;
            match restored {
                Ok(stock) => info!(%product_id, quantity, stock, "Deduction compensated"),
                Err(e) => error!(%product_id, quantity, error = %e, "Compensation failed, stock needs manual repair"),
            }
        }
    }

    /// Must run under the product lock.
    async fn reserve_line(&self, user_id: UserId, product_id: ProductId, quantity: u32) -> Result<CartLine, CheckoutError> {
        if self.store.find_product(product_id).await?.is_none() {
            return Err(CheckoutError::ProductNotFound(product_id));
        }
        let available = self.stock.get(product_id).await?
            .ok_or(CheckoutError::StockNotFound(product_id))?;
        if available < u64::from(quantity) {
            return Err(CheckoutError::OutOfStock {
                product_id,
                requested: u64::from(quantity),
                available,
            });
        }
        let line = CartLine::new(user_id, product_id, quantity);
        self.store.save_cart_line(line).await?;
        debug!(quantity, available, "Cart line saved");
        Ok(line)
    }

    async fn balance_of(&self, user_id: UserId) -> Result<Decimal, CheckoutError> {
        self.store.find_user_balance(user_id).await?
            .ok_or(CheckoutError::UserNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use crate::domain::{Account, Product};
    use crate::kv::{stock_key, KvActor, KvClient, KvStore};
    use crate::store::MemoryStore;

    struct Fixture {
        service: CheckoutService,
        stock: StockCache,
        store: MemoryStore,
        kv: KvClient,
    }

    async fn fixture() -> Fixture {
        let (actor, kv) = KvActor::new(64);
        tokio::spawn(actor.run());
        let (store, _handles) = MemoryStore::spawn(64);

        store.save_product(Product::new(1, "Keyboard", dec!(50.00), 10)).await.unwrap();
        store.save_product(Product::new(2, "Mouse", dec!(20.00), 4)).await.unwrap();
        store.open_account(Account::new(7, "alice", dec!(500.00))).await.unwrap();

        let kv_store: Arc<dyn KvStore> = Arc::new(kv.clone());
        let durable: Arc<dyn DurableStore> = Arc::new(store.clone());
        let locks = LockManager::new(kv_store.clone(), Duration::from_secs(30), Duration::from_millis(10));
        let stock = StockCache::new(kv_store, durable.clone(), Duration::from_secs(3600));
        stock.warm_up().await.unwrap();

        let service = CheckoutService::new(locks, stock.clone(), durable, Duration::from_secs(1));
        Fixture { service, stock, store, kv }
    }

    #[tokio::test]
    async fn deduct_stock_writes_through() {
        let f = fixture().await;
        assert_eq!(f.service.deduct_stock(ProductId(1), 3).await, Ok(7));
        assert_eq!(f.store.find_stock(ProductId(1)).await, Ok(Some(7)));

        assert_eq!(
            f.service.deduct_stock(ProductId(2), 5).await,
            Err(CheckoutError::OutOfStock { product_id: ProductId(2), requested: 5, available: 4 })
        );
        assert_eq!(f.store.find_stock(ProductId(2)).await, Ok(Some(4)));
    }

    #[tokio::test]
    async fn evicted_entries_are_resynced_before_deducting() {
        let f = fixture().await;
        f.stock.delete(ProductId(1)).await.unwrap();

        assert_eq!(f.service.deduct_stock(ProductId(1), 4).await, Ok(6));
        assert_eq!(f.kv.get(&stock_key(ProductId(1))).await, Ok(Some(6)));
        assert_eq!(f.store.find_stock(ProductId(1)).await, Ok(Some(6)));
    }

    #[tokio::test]
    async fn unknown_products_are_reported_as_inconsistent() {
        let f = fixture().await;
        assert_eq!(
            f.service.deduct_stock(ProductId(99), 1).await,
            Err(CheckoutError::StockDataInconsistent(ProductId(99)))
        );
        assert_eq!(f.service.deduct_stock(ProductId(1), 0).await, Err(CheckoutError::InvalidQuantity));
    }

    #[tokio::test]
    async fn restock_adds_and_commits() {
        let f = fixture().await;
        assert_eq!(f.service.restock(ProductId(2), 6).await, Ok(10));
        assert_eq!(f.store.find_stock(ProductId(2)).await, Ok(Some(10)));
        assert_eq!(f.stock.cached(ProductId(2)).await, Ok(Some(10)));
    }

    #[tokio::test]
    async fn cart_lines_are_checked_against_stock() {
        let f = fixture().await;
        let user = UserId(7);

        assert_eq!(f.service.add_to_cart(user, ProductId(2), 3).await, Ok(CartLine::new(7, 2, 3)));
        assert_eq!(
            f.service.add_to_cart(user, ProductId(2), 2).await,
            Err(CheckoutError::OutOfStock { product_id: ProductId(2), requested: 5, available: 4 })
        );
        assert_eq!(f.service.update_cart_quantity(user, ProductId(2), 4).await, Ok(CartLine::new(7, 2, 4)));
        assert_eq!(f.service.update_cart_quantity(user, ProductId(2), 0).await, Err(CheckoutError::InvalidQuantity));

        assert_eq!(
            f.service.add_to_cart(user, ProductId(99), 1).await,
            Err(CheckoutError::ProductNotFound(ProductId(99)))
        );
        assert_eq!(
            f.service.add_to_cart(UserId(404), ProductId(1), 1).await,
            Err(CheckoutError::UserNotFound(UserId(404)))
        );
    }

    #[tokio::test]
    async fn removing_a_cart_line_requires_the_line() {
        let f = fixture().await;
        let user = UserId(7);
        f.service.add_to_cart(user, ProductId(1), 2).await.unwrap();
        f.service.add_to_cart(user, ProductId(2), 1).await.unwrap();

        assert_eq!(f.service.remove_from_cart(user, ProductId(1)).await, Ok(()));
        assert_eq!(f.store.find_cart_lines(user).await.unwrap(), vec![CartLine::new(7, 2, 1)]);
        assert_eq!(
            f.service.remove_from_cart(user, ProductId(1)).await,
            Err(CheckoutError::CartLineNotFound { user_id: user, product_id: ProductId(1) })
        );
        assert_eq!(
            f.service.remove_from_cart(UserId(404), ProductId(2)).await,
            Err(CheckoutError::UserNotFound(UserId(404)))
        );
        assert_eq!(f.stock.cached(ProductId(1)).await, Ok(Some(10)));
    }

    #[tokio::test]
    async fn cart_summary_totals_at_durable_prices() {
        let f = fixture().await;
        let user = UserId(7);
        f.service.add_to_cart(user, ProductId(1), 2).await.unwrap();
        f.service.add_to_cart(user, ProductId(2), 3).await.unwrap();

        let summary = f.service.cart_summary(user).await.unwrap();
        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.total_quantity, 5);
        assert_eq!(summary.total_amount, dec!(160.00));

        f.store.delete_product(ProductId(2)).await.unwrap();
        let summary = f.service.cart_summary(user).await.unwrap();
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.total_amount, dec!(100.00));
    }
}
