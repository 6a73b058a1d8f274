use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};
use crate::kv::KvStore;
use super::LockError;

/// Keeps a watchdog-leased lock alive by extending its lease every third of
/// the lease period. Aborted when dropped.
pub(crate) struct Watchdog {
    handle: JoinHandle<()>,
}

impl Watchdog {
    pub(crate) fn spawn(kv: Arc<dyn KvStore>, key: String, token: String, lease: Duration) -> Self {
        let period = lease / 3;
        let span = info_span!("lock_watchdog", key = %key);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                match kv.expire_if_equals(&key, &token, lease).await {
                    Ok(true) => debug!("Lease renewed"),
                    Ok(false) => {
                        warn!("Lock lost before renewal, stopping watchdog");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Lease renewal failed"),
                }
            }
        }.instrument(span));
        Self { handle }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Proof of exclusive ownership of one lock key.
///
/// Release it with [`LockGuard::release`]. A guard dropped without release
/// (cancelled future, panic) stops its watchdog and schedules an
/// owner-checked release on the current runtime.
pub struct LockGuard {
    kv: Arc<dyn KvStore>,
    key: String,
    token: String,
    watchdog: Option<Watchdog>,
    released: bool,
}

impl LockGuard {
    pub(crate) fn new(kv: Arc<dyn KvStore>, key: String, token: String, watchdog: Option<Watchdog>) -> Self {
        Self {
            kv,
            key,
            token,
            watchdog,
            released: false,
        }
    }

    /// Releases the lock if this guard still owns it.
    ///
    /// Returns `false` when the lease had already expired; in that case the
    /// key is left untouched, even if another holder owns it now.
    pub async fn release(mut self) -> Result<bool, LockError> {
        self.watchdog.take();
        let held = self.kv.delete_if_equals(&self.key, &self.token).await;
        self.released = true;
        let held = held?;
        if held {
            debug!(key = %self.key, "Lock released");
        } else {
            warn!(key = %self.key, "Lock lease expired before release");
        }
        Ok(held)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.watchdog.take();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(key = %self.key, "Guard dropped outside a runtime, lock left to its lease");
            return;
        };
        let kv = self.kv.clone();
        let key = std::mem::take(&mut self.key);
        let token = std::mem::take(&mut self.token);
        runtime.spawn(async move {
            match kv.delete_if_equals(&key, &token).await {
                Ok(held) => debug!(key = %key, held, "Released lock of dropped guard"),
                Err(e) => warn!(key = %key, error = %e, "Failed to release lock of dropped guard"),
            }
        });
    }
}
