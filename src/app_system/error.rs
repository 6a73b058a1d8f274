use thiserror::Error;
use crate::config::ConfigError;
use crate::lock::LockError;
use crate::stock::StockError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Actor task failed: {0}")]
    ActorFailed(String),
}
