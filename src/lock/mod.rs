//! Distributed lock manager.
//!
//! Locks live in the shared key-value service as `SET NX` tokens with a lease,
//! so mutual exclusion holds across every process that talks to the same
//! service. Each acquisition gets a fresh random holder token and only that
//! token can release or renew the lock.

mod error;
mod guard;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use crate::kv::KvStore;

pub use error::*;
pub use guard::LockGuard;
use guard::Watchdog;

/// How long an acquired lock stays valid without being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseTime {
    /// Expires after the given duration no matter what the holder is doing.
    Fixed(Duration),
    /// Held until released. A watchdog keeps renewing a short lease while the
    /// guard is alive, so a crashed holder still loses the lock eventually.
    Watchdog,
}

#[derive(Clone)]
pub struct LockManager {
    kv: Arc<dyn KvStore>,
    watchdog_timeout: Duration,
    retry_interval: Duration,
}

impl LockManager {
    pub fn new(kv: Arc<dyn KvStore>, watchdog_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            kv,
            watchdog_timeout,
            retry_interval,
        }
    }

    /// Waits up to `wait` for exclusive ownership of `key`.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn acquire(&self, key: &str, wait: Duration, lease: LeaseTime) -> Result<LockGuard, LockError> {
        let ttl = match lease {
            LeaseTime::Fixed(ttl) if ttl.is_zero() => return Err(LockError::InvalidLease),
            LeaseTime::Fixed(ttl) => ttl,
            LeaseTime::Watchdog => self.watchdog_timeout,
        };
        let token = Uuid::new_v4().to_string();
        let started = Instant::now();
        // A wait past the clock's range never times out.
        let deadline = started.checked_add(wait);

        loop {
            if self.kv.set_if_absent(key, &token, Some(ttl)).await? {
                debug!(waited_ms = started.elapsed().as_millis() as u64, "Lock acquired");
                let watchdog = matches!(lease, LeaseTime::Watchdog).then(|| {
                    Watchdog::spawn(self.kv.clone(), key.to_string(), token.clone(), self.watchdog_timeout)
                });
                return Ok(LockGuard::new(self.kv.clone(), key.to_string(), token, watchdog));
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    warn!("Timed out waiting for lock");
                    return Err(LockError::Timeout { key: key.to_string(), waited: wait });
                }
                Some(deadline) => self.retry_interval.min(deadline - now),
                None => self.retry_interval,
            };
            sleep(pause).await;
        }
    }

    /// Owner-checked release. Returns `false` if the guard no longer owned the lock.
    pub async fn release(&self, guard: LockGuard) -> Result<bool, LockError> {
        guard.release().await
    }

    pub async fn is_locked(&self, key: &str) -> Result<bool, LockError> {
        Ok(self.kv.exists(key).await?)
    }

    /// Runs `action` while holding `key`.
    ///
    /// The lock is released on every exit path: after `Ok`, after `Err`, and
    /// through the guard's drop when the returned future is cancelled or the
    /// action panics. Nothing runs if the lock cannot be acquired in time.
    pub async fn with_lock<F, Fut, T, E>(
        &self,
        key: &str,
        wait: Duration,
        lease: LeaseTime,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let guard = self.acquire(key, wait, lease).await?;
        let result = action().await;
        if let Err(e) = guard.release().await {
            warn!(key, error = %e, "Failed to release lock, it will expire with its lease");
        }
        result
    }
}
