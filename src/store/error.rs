use thiserror::Error;
use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Durable store unavailable: {0}")]
    Unavailable(String),
    #[error("Durable store rejected the write: {0}")]
    Rejected(String),
    #[error("Unexpected response from durable store: {0}")]
    UnexpectedResponse(String),
}

impl StoreError {
    pub fn from_framework(entity: &'static str, error: FrameworkError) -> Self {
        match error {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => {
                StoreError::Unavailable(format!("{entity} store: {error}"))
            }
            FrameworkError::NotFound(id) => StoreError::NotFound { entity, id },
            FrameworkError::Rejected(reason) => StoreError::Rejected(reason),
        }
    }
}
