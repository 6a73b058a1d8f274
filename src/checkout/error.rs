use rust_decimal::Decimal;
use thiserror::Error;
use crate::domain::{ProductId, UserId};
use crate::kv::KvError;
use crate::lock::LockError;
use crate::stock::StockError;
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    /// Another request holds the lock. Safe to retry.
    #[error("System busy, timed out waiting for {key}, please retry")]
    LockTimeout { key: String },
    #[error("No stock record for product {0}")]
    StockNotFound(ProductId),
    #[error("Product {product_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock { product_id: ProductId, requested: u64, available: u64 },
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },
    #[error("Cart of user {user_id} has no line for product {product_id}")]
    CartLineNotFound { user_id: UserId, product_id: ProductId },
    #[error("Cart of user {0} is empty")]
    EmptyCart(UserId),
    /// Cache and durable store disagree in a way they never should.
    #[error("Stock data inconsistent for product {0}")]
    StockDataInconsistent(ProductId),
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("Quantity must be positive")]
    InvalidQuantity,
    #[error(transparent)]
    Lock(LockError),
    #[error(transparent)]
    Stock(StockError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Transient system failures the caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::LockTimeout { .. } => true,
            CheckoutError::Lock(LockError::Backend(KvError::Unavailable(_))) => true,
            CheckoutError::Stock(StockError::Kv(KvError::Unavailable(_))) => true,
            CheckoutError::Store(StoreError::Unavailable(_)) => true,
            _ => false,
        }
    }

    /// Business outcomes. Retrying them unchanged gives the same answer.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            CheckoutError::OutOfStock { .. }
                | CheckoutError::InsufficientFunds { .. }
                | CheckoutError::EmptyCart(_)
        )
    }
}

impl From<LockError> for CheckoutError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Timeout { key, .. } => CheckoutError::LockTimeout { key },
            other => CheckoutError::Lock(other),
        }
    }
}

impl From<StockError> for CheckoutError {
    fn from(error: StockError) -> Self {
        match error {
            StockError::NotFound(product_id) => CheckoutError::StockNotFound(product_id),
            StockError::CorruptCounter { product_id, .. } => CheckoutError::StockDataInconsistent(product_id),
            StockError::InvalidQuantity(_) => CheckoutError::InvalidQuantity,
            StockError::Store(e) => CheckoutError::Store(e),
            other => CheckoutError::Stock(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    #[test]
    fn lock_timeouts_are_retryable_and_business_failures_are_not() {
        let busy = CheckoutError::from(LockError::Timeout {
            key: "product_lock:1".to_string(),
            waited: Duration::from_secs(10),
        });
        assert_eq!(busy, CheckoutError::LockTimeout { key: "product_lock:1".to_string() });
        assert!(busy.is_retryable());
        assert!(!busy.is_business());

        let broke = CheckoutError::InsufficientFunds { balance: dec!(100.00), required: dec!(150.00) };
        assert!(broke.is_business());
        assert!(!broke.is_retryable());
    }

    #[test]
    fn corrupt_counters_surface_as_inconsistency() {
        let error = CheckoutError::from(StockError::CorruptCounter { product_id: ProductId(3), value: -1 });
        assert_eq!(error, CheckoutError::StockDataInconsistent(ProductId(3)));
    }
}
