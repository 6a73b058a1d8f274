use rust_decimal::Decimal;
use tracing::{debug, instrument};
use crate::account_actor::AccountAction;
use crate::actor_framework::ResourceClient;
use crate::domain::{Account, UserId};
use crate::store::StoreError;

/// Client for interacting with the Account actor.
#[derive(Clone)]
pub struct AccountClient {
    inner: ResourceClient<Account>,
}

impl_basic_client!(AccountClient, Account, UserId, account);

impl AccountClient {
    #[instrument(skip(self))]
    pub async fn set_balance(&self, id: UserId, balance: Decimal) -> Result<Decimal, StoreError> {
        debug!("Sending request");
        self.inner.perform_action(id, AccountAction::SetBalance(balance)).await
            .map_err(|e| StoreError::from_framework("account", e))
    }
}
