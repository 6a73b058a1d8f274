//! Durable store: the system of record for stock, balances, and carts.
//!
//! The inventory core only depends on [`DurableStore`]. [`MemoryStore`] is the
//! in-process implementation backed by resource actors.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::domain::{CartLine, Product, ProductId, UserId};

pub use error::*;
pub use memory::MemoryStore;

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Committed stock of a product, `None` if the product does not exist.
    async fn find_stock(&self, product_id: ProductId) -> Result<Option<u32>, StoreError>;

    /// Commits a new stock level. Fails with `NotFound` for unknown products.
    async fn save_stock(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError>;

    /// Committed stock of every product, used to warm the cache at startup.
    async fn stock_snapshot(&self) -> Result<Vec<(ProductId, u32)>, StoreError>;

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn save_product(&self, product: Product) -> Result<(), StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_product(&self, product_id: ProductId) -> Result<bool, StoreError>;

    async fn find_user_balance(&self, user_id: UserId) -> Result<Option<Decimal>, StoreError>;

    async fn save_user_balance(&self, user_id: UserId, balance: Decimal) -> Result<(), StoreError>;

    /// Lines of the user's cart; empty for a user without lines.
    async fn find_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError>;

    /// Sets the quantity of one cart line, replacing any previous quantity.
    async fn save_cart_line(&self, line: CartLine) -> Result<(), StoreError>;

    /// Removes one cart line. Returns `false` if the cart had no such line.
    async fn remove_cart_line(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError>;

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError>;
}
