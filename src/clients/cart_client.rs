use tracing::{debug, instrument};
use crate::actor_framework::ResourceClient;
use crate::cart_actor::CartAction;
use crate::domain::{Cart, ProductId, UserId};
use crate::store::StoreError;

/// Client for interacting with the Cart actor.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<Cart>,
}

impl_basic_client!(CartClient, Cart, UserId, cart);

impl CartClient {
    #[instrument(skip(self))]
    pub async fn set_line(&self, user_id: UserId, product_id: ProductId, quantity: u32) -> Result<Cart, StoreError> {
        debug!("Sending request");
        self.inner.perform_action(user_id, CartAction::SetLine { product_id, quantity }).await
            .map_err(|e| StoreError::from_framework("cart", e))
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart, StoreError> {
        debug!("Sending request");
        self.inner.perform_action(user_id, CartAction::Clear).await
            .map_err(|e| StoreError::from_framework("cart", e))
    }
}
