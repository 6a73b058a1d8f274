use std::time::Duration;
use thiserror::Error;
use crate::kv::KvError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LockError {
    /// The lock stayed busy for the whole wait window. Retryable.
    #[error("Timed out after {waited:?} waiting for lock {key}")]
    Timeout { key: String, waited: Duration },
    #[error("Lease duration must be positive")]
    InvalidLease,
    #[error("Lock backend error: {0}")]
    Backend(#[from] KvError),
}
