use thiserror::Error;
use crate::domain::ProductId;
use crate::kv::KvError;
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockError {
    /// The durable store has no stock record for the product.
    #[error("No stock record for product {0}")]
    NotFound(ProductId),
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(u64),
    /// The cached counter holds a value no stock level can have.
    #[error("Cached stock for product {product_id} is out of range: {value}")]
    CorruptCounter { product_id: ProductId, value: i64 },
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
