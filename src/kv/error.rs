use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum KvError {
    #[error("Key-value service unavailable: {0}")]
    Unavailable(String),
    #[error("Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),
    #[error("Counter overflow: {0}")]
    Overflow(String),
}
