use tracing::{debug, instrument};
use crate::actor_framework::ResourceClient;
use crate::domain::{Product, ProductId};
use crate::product_actor::{ProductAction, ProductActionResult};
use crate::store::StoreError;

/// Client for interacting with the Product actor.
#[derive(Clone)]
pub struct ProductClient {
    inner: ResourceClient<Product>,
}

impl_basic_client!(ProductClient, Product, ProductId, product);

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn check_stock(&self, id: ProductId) -> Result<u32, StoreError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::CheckStock).await {
            Ok(ProductActionResult::StockLevel(level)) => Ok(level),
            Ok(other) => Err(StoreError::UnexpectedResponse(format!("{other:?}"))),
            Err(e) => Err(StoreError::from_framework("product", e)),
        }
    }

    /// Overwrites the committed stock and returns the previous level.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, stock: u32) -> Result<u32, StoreError> {
        debug!("Sending request");
        match self.inner.perform_action(id, ProductAction::SetStock(stock)).await {
            Ok(ProductActionResult::StockSet { previous }) => Ok(previous),
            Ok(other) => Err(StoreError::UnexpectedResponse(format!("{other:?}"))),
            Err(e) => Err(StoreError::from_framework("product", e)),
        }
    }
}
