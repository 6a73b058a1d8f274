use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use crate::actor_framework::ResourceActor;
use crate::clients::{AccountClient, CartClient, ProductClient};
use crate::domain::{Account, Cart, CartLine, Product, ProductId, UserId};
use super::{DurableStore, StoreError};

/// In-process system of record: one resource actor per table.
#[derive(Clone)]
pub struct MemoryStore {
    products: ProductClient,
    accounts: AccountClient,
    carts: CartClient,
}

impl MemoryStore {
    pub fn new(products: ProductClient, accounts: AccountClient, carts: CartClient) -> Self {
        Self { products, accounts, carts }
    }

    /// Starts the product, account, and cart actors and returns their task handles.
    pub fn spawn(buffer_size: usize) -> (Self, Vec<JoinHandle<()>>) {
        let (product_actor, products) = ResourceActor::<Product>::new(buffer_size);
        let (account_actor, accounts) = ResourceActor::<Account>::new(buffer_size);
        let (cart_actor, carts) = ResourceActor::<Cart>::new(buffer_size);

        let handles = vec![
            tokio::spawn(product_actor.run()),
            tokio::spawn(account_actor.run()),
            tokio::spawn(cart_actor.run()),
        ];
        let store = Self::new(
            ProductClient::new(products),
            AccountClient::new(accounts),
            CartClient::new(carts),
        );
        (store, handles)
    }

    /// Registers an account together with its empty cart.
    #[instrument(skip(self, account), fields(user_id = %account.id))]
    pub async fn open_account(&self, account: Account) -> Result<(), StoreError> {
        let user_id = account.id;
        self.accounts.insert_account(account).await?;
        self.carts.insert_cart(Cart::empty(user_id)).await?;
        debug!("Account opened");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.products.shutdown().await;
        self.accounts.shutdown().await;
        self.carts.shutdown().await;
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn find_stock(&self, product_id: ProductId) -> Result<Option<u32>, StoreError> {
        match self.products.check_stock(product_id).await {
            Ok(stock) => Ok(Some(stock)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save_stock(&self, product_id: ProductId, quantity: u32) -> Result<(), StoreError> {
        let previous = self.products.set_stock(product_id, quantity).await?;
        debug!(%product_id, previous, quantity, "Committed stock");
        Ok(())
    }

    async fn stock_snapshot(&self) -> Result<Vec<(ProductId, u32)>, StoreError> {
        let mut snapshot: Vec<_> = self.products.list_products().await?
            .into_iter()
            .map(|product| (product.id, product.stock))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);
        Ok(snapshot)
    }

    async fn find_product(&self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        self.products.get_product(product_id).await
    }

    async fn save_product(&self, product: Product) -> Result<(), StoreError> {
        self.products.insert_product(product).await
    }

    async fn delete_product(&self, product_id: ProductId) -> Result<bool, StoreError> {
        self.products.delete_product(product_id).await
    }

    async fn find_user_balance(&self, user_id: UserId) -> Result<Option<Decimal>, StoreError> {
        Ok(self.accounts.get_account(user_id).await?.map(|account| account.balance))
    }

    async fn save_user_balance(&self, user_id: UserId, balance: Decimal) -> Result<(), StoreError> {
        self.accounts.set_balance(user_id, balance).await?;
        Ok(())
    }

    async fn find_cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        Ok(self.carts.get_cart(user_id).await?
            .map(|cart| cart.lines)
            .unwrap_or_default())
    }

    async fn save_cart_line(&self, line: CartLine) -> Result<(), StoreError> {
        self.carts.set_line(line.user_id, line.product_id, line.quantity).await?;
        Ok(())
    }

    async fn remove_cart_line(&self, user_id: UserId, product_id: ProductId) -> Result<bool, StoreError> {
        let Some(cart) = self.carts.get_cart(user_id).await? else {
            return Ok(false);
        };
        if cart.line(product_id).is_none() {
            return Ok(false);
        }
        self.carts.set_line(user_id, product_id, 0).await?;
        Ok(true)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        match self.carts.clear(user_id).await {
            Ok(_) | Err(StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
