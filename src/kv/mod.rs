//! Key-value counter and lock service.
//!
//! The stock cache and the lock manager only ever talk to [`KvStore`]. The
//! command set mirrors what a Redis-compatible server offers (INCRBY, SET NX PX,
//! owner-checked delete/expire scripts) so a networked backend can stand in
//! for [`KvClient`] once the service runs on more than one node.

pub mod error;
pub mod keys;
pub mod memory;

use std::time::Duration;
use async_trait::async_trait;

pub use error::*;
pub use keys::*;
pub use memory::{KvActor, KvClient};

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a counter. `None` if the key is missing or expired.
    async fn get(&self, key: &str) -> Result<Option<i64>, KvError>;

    async fn exists(&self, key: &str) -> Result<bool, KvError>;

    /// Remaining time to live. `None` if the key is missing or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError>;

    /// Overwrites a counter unconditionally, replacing any previous expiry.
    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), KvError>;

    /// Overwrites many counters in a single round trip.
    async fn set_batch(&self, entries: Vec<(String, i64)>, ttl: Option<Duration>) -> Result<(), KvError>;

    /// Atomically adds `delta` and returns the new value. A missing key starts at zero
    /// without expiry; an existing key keeps its expiry.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, KvError>;

    /// Adds `delta` only if the key exists, checked and applied as one command.
    /// Returns `None` without creating anything when the key is missing or expired.
    async fn incr_by_if_exists(&self, key: &str, delta: i64) -> Result<Option<i64>, KvError>;

    /// Sets the expiry of an existing key. Returns `false` if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;

    async fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Stores `token` under `key` only if the key is free.
    async fn set_if_absent(&self, key: &str, token: &str, ttl: Option<Duration>) -> Result<bool, KvError>;

    /// Deletes `key` only if it currently holds `token`.
    async fn delete_if_equals(&self, key: &str, token: &str) -> Result<bool, KvError>;

    /// Extends `key` only if it currently holds `token`.
    async fn expire_if_equals(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, KvError>;
}
