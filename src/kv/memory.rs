use std::collections::HashMap;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use super::{KvError, KvStore};

type KvResponse<T> = oneshot::Sender<Result<T, KvError>>;

#[derive(Debug)]
pub enum KvRequest {
    Get { key: String, respond_to: KvResponse<Option<i64>> },
    Exists { key: String, respond_to: KvResponse<bool> },
    Ttl { key: String, respond_to: KvResponse<Option<Duration>> },
    Set { key: String, value: i64, ttl: Option<Duration>, respond_to: KvResponse<()> },
    SetBatch { entries: Vec<(String, i64)>, ttl: Option<Duration>, respond_to: KvResponse<()> },
    IncrBy { key: String, delta: i64, respond_to: KvResponse<i64> },
    IncrByIfExists { key: String, delta: i64, respond_to: KvResponse<Option<i64>> },
    Expire { key: String, ttl: Duration, respond_to: KvResponse<bool> },
    Delete { key: String, respond_to: KvResponse<bool> },
    SetIfAbsent { key: String, token: String, ttl: Option<Duration>, respond_to: KvResponse<bool> },
    DeleteIfEquals { key: String, token: String, respond_to: KvResponse<bool> },
    ExpireIfEquals { key: String, token: String, ttl: Duration, respond_to: KvResponse<bool> },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Counter(i64),
    Token(String),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(expiry_after),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Single-owner keyspace. Commands run one at a time in mailbox order, which
/// makes each command atomic the same way a single-threaded Redis server does.
/// Expired keys are dropped lazily when touched.
pub struct KvActor {
    receiver: mpsc::Receiver<KvRequest>,
    entries: HashMap<String, Entry>,
}

impl KvActor {
    pub fn new(buffer_size: usize) -> (Self, KvClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            entries: HashMap::new(),
        };
        (actor, KvClient { sender })
    }

    #[instrument(name = "kv_actor", skip(self))]
    pub async fn run(mut self) {
        info!("KvActor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                KvRequest::Get { key, respond_to } => {
                    let _ = respond_to.send(self.handle_get(&key));
                }
                KvRequest::Exists { key, respond_to } => {
                    let _ = respond_to.send(Ok(self.live(&key).is_some()));
                }
                KvRequest::Ttl { key, respond_to } => {
                    let now = Instant::now();
                    let ttl = self.live(&key)
                        .and_then(|entry| entry.expires_at)
                        .map(|at| at.saturating_duration_since(now));
                    let _ = respond_to.send(Ok(ttl));
                }
                KvRequest::Set { key, value, ttl, respond_to } => {
                    self.entries.insert(key, Entry::new(Value::Counter(value), ttl));
                    let _ = respond_to.send(Ok(()));
                }
                KvRequest::SetBatch { entries, ttl, respond_to } => {
                    debug!(count = entries.len(), "Applying batch set");
                    for (key, value) in entries {
                        self.entries.insert(key, Entry::new(Value::Counter(value), ttl));
                    }
                    let _ = respond_to.send(Ok(()));
                }
                KvRequest::IncrBy { key, delta, respond_to } => {
                    let _ = respond_to.send(self.handle_incr_by(key, delta));
                }
                KvRequest::IncrByIfExists { key, delta, respond_to } => {
                    let result = if self.live(&key).is_some() {
                        self.handle_incr_by(key, delta).map(Some)
                    } else {
                        Ok(None)
                    };
                    let _ = respond_to.send(result);
                }
                KvRequest::Expire { key, ttl, respond_to } => {
                    let updated = match self.live(&key) {
                        Some(entry) => {
                            entry.expires_at = expiry_after(ttl);
                            true
                        }
                        None => false,
                    };
                    let _ = respond_to.send(Ok(updated));
                }
                KvRequest::Delete { key, respond_to } => {
                    let existed = self.live(&key).is_some();
                    self.entries.remove(&key);
                    let _ = respond_to.send(Ok(existed));
                }
                KvRequest::SetIfAbsent { key, token, ttl, respond_to } => {
                    let acquired = if self.live(&key).is_some() {
                        false
                    } else {
                        self.entries.insert(key, Entry::new(Value::Token(token), ttl));
                        true
                    };
                    let _ = respond_to.send(Ok(acquired));
                }
                KvRequest::DeleteIfEquals { key, token, respond_to } => {
                    let owned = self.holds_token(&key, &token);
                    if owned {
                        self.entries.remove(&key);
                    }
                    let _ = respond_to.send(Ok(owned));
                }
                KvRequest::ExpireIfEquals { key, token, ttl, respond_to } => {
                    let owned = self.holds_token(&key, &token);
                    if let Some(entry) = self.entries.get_mut(&key).filter(|_| owned) {
                        entry.expires_at = expiry_after(ttl);
                    }
                    let _ = respond_to.send(Ok(owned));
                }
                KvRequest::Shutdown => {
                    info!("KvActor shutting down");
                    break;
                }
            }
        }
        info!("KvActor stopped");
    }

    /// Returns the entry for `key` unless it is missing or expired, evicting it in the latter case.
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        self.evict_if_expired(key);
        self.entries.get_mut(key)
    }

    fn evict_if_expired(&mut self, key: &str) {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            debug!(key, "Evicting expired key");
            self.entries.remove(key);
        }
    }

    fn holds_token(&mut self, key: &str, token: &str) -> bool {
        matches!(self.live(key), Some(Entry { value: Value::Token(held), .. }) if held.as_str() == token)
    }

    fn handle_get(&mut self, key: &str) -> Result<Option<i64>, KvError> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { value: Value::Counter(value), .. }) => Ok(Some(*value)),
            Some(_) => Err(KvError::WrongType(key.to_string())),
        }
    }

    fn handle_incr_by(&mut self, key: String, delta: i64) -> Result<i64, KvError> {
        self.evict_if_expired(&key);
        let entry = self.entries.entry(key.clone())
            .or_insert_with(|| Entry::new(Value::Counter(0), None));
        match &mut entry.value {
            Value::Counter(value) => {
                *value = value.checked_add(delta)
                    .ok_or_else(|| KvError::Overflow(key.clone()))?;
                Ok(*value)
            }
            Value::Token(_) => Err(KvError::WrongType(key)),
        }
    }
}

/// Deadline `ttl` from now. A ttl past the clock's range means no expiry.
fn expiry_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

/// Handle to a [`KvActor`]. Cheap to clone; every clone talks to the same keyspace.
#[derive(Clone)]
pub struct KvClient {
    sender: mpsc::Sender<KvRequest>,
}

impl KvClient {
    async fn request<R>(&self, build: impl FnOnce(KvResponse<R>) -> KvRequest) -> Result<R, KvError> {
        let (respond_to, response) = oneshot::channel();
        self.sender.send(build(respond_to))
            .await.map_err(|_| KvError::Unavailable("Actor closed".to_string()))?;
        response.await.map_err(|_| KvError::Unavailable("Actor dropped".to_string()))?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(KvRequest::Shutdown).await;
    }
}

#[async_trait]
impl KvStore for KvClient {
    async fn get(&self, key: &str) -> Result<Option<i64>, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Get { key, respond_to }).await
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Exists { key, respond_to }).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Ttl { key, respond_to }).await
    }

    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Set { key, value, ttl, respond_to }).await
    }

    async fn set_batch(&self, entries: Vec<(String, i64)>, ttl: Option<Duration>) -> Result<(), KvError> {
        self.request(|respond_to| KvRequest::SetBatch { entries, ttl, respond_to }).await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::IncrBy { key, delta, respond_to }).await
    }

    async fn incr_by_if_exists(&self, key: &str, delta: i64) -> Result<Option<i64>, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::IncrByIfExists { key, delta, respond_to }).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Expire { key, ttl, respond_to }).await
    }

    async fn delete(&self, key: &str) -> Result<bool, KvError> {
        let key = key.to_string();
        self.request(|respond_to| KvRequest::Delete { key, respond_to }).await
    }

    async fn set_if_absent(&self, key: &str, token: &str, ttl: Option<Duration>) -> Result<bool, KvError> {
        let (key, token) = (key.to_string(), token.to_string());
        self.request(|respond_to| KvRequest::SetIfAbsent { key, token, ttl, respond_to }).await
    }

    async fn delete_if_equals(&self, key: &str, token: &str) -> Result<bool, KvError> {
        let (key, token) = (key.to_string(), token.to_string());
        self.request(|respond_to| KvRequest::DeleteIfEquals { key, token, respond_to }).await
    }

    async fn expire_if_equals(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, KvError> {
        let (key, token) = (key.to_string(), token.to_string());
        self.request(|respond_to| KvRequest::ExpireIfEquals { key, token, ttl, respond_to }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_kv() -> KvClient {
        let (actor, client) = KvActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn incr_by_starts_missing_keys_at_zero() {
        let kv = spawn_kv();
        assert_eq!(kv.incr_by("stock:1", 4).await, Ok(4));
        assert_eq!(kv.incr_by("stock:1", -6).await, Ok(-2));
        assert_eq!(kv.get("stock:1").await, Ok(Some(-2)));
        assert_eq!(kv.ttl("stock:1").await, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_on_the_wall_clock() {
        let kv = spawn_kv();
        kv.set("stock:1", 5, Some(Duration::from_secs(10))).await.unwrap();
        assert!(kv.exists("stock:1").await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(kv.incr_by("stock:1", -1).await, Ok(4));
        assert_eq!(kv.ttl("stock:1").await.unwrap(), Some(Duration::from_secs(4)));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(kv.get("stock:1").await, Ok(None));
        assert!(!kv.exists("stock:1").await.unwrap());
        assert!(!kv.expire("stock:1", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_increment_never_recreates_an_expired_key() {
        let kv = spawn_kv();
        kv.set("stock:1", 5, Some(Duration::from_secs(10))).await.unwrap();
        assert_eq!(kv.incr_by_if_exists("stock:1", -2).await, Ok(Some(3)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(kv.incr_by_if_exists("stock:1", -2).await, Ok(None));
        assert!(!kv.exists("stock:1").await.unwrap());
        assert_eq!(kv.incr_by_if_exists("stock:2", 1).await, Ok(None));
    }

    #[tokio::test]
    async fn out_of_range_ttls_mean_no_expiry() {
        let kv = spawn_kv();
        kv.set("stock:1", 5, Some(Duration::MAX)).await.unwrap();
        assert_eq!(kv.ttl("stock:1").await, Ok(None));
        assert!(kv.expire("stock:1", Duration::MAX).await.unwrap());

        assert!(kv.set_if_absent("product_lock:1", "a", Some(Duration::MAX)).await.unwrap());
        assert!(kv.expire_if_equals("product_lock:1", "a", Duration::MAX).await.unwrap());
        assert_eq!(kv.get("stock:1").await, Ok(Some(5)));
    }

    #[tokio::test]
    async fn set_batch_writes_every_entry() {
        let kv = spawn_kv();
        let entries = vec![("stock:1".to_string(), 3), ("stock:2".to_string(), 7)];
        kv.set_batch(entries, Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(kv.get("stock:1").await, Ok(Some(3)));
        assert_eq!(kv.get("stock:2").await, Ok(Some(7)));
        assert!(kv.ttl("stock:2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tokens_are_only_released_by_their_owner() {
        let kv = spawn_kv();
        assert!(kv.set_if_absent("product_lock:1", "a", None).await.unwrap());
        assert!(!kv.set_if_absent("product_lock:1", "b", None).await.unwrap());

        assert!(!kv.delete_if_equals("product_lock:1", "b").await.unwrap());
        assert!(!kv.expire_if_equals("product_lock:1", "b", Duration::from_secs(1)).await.unwrap());
        assert!(kv.exists("product_lock:1").await.unwrap());

        assert!(kv.delete_if_equals("product_lock:1", "a").await.unwrap());
        assert!(!kv.delete_if_equals("product_lock:1", "a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_frees_the_key() {
        let kv = spawn_kv();
        assert!(kv.set_if_absent("product_lock:1", "a", Some(Duration::from_secs(2))).await.unwrap());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(kv.set_if_absent("product_lock:1", "b", Some(Duration::from_secs(2))).await.unwrap());
        assert!(!kv.delete_if_equals("product_lock:1", "a").await.unwrap());
    }

    #[tokio::test]
    async fn counter_commands_reject_lock_keys() {
        let kv = spawn_kv();
        kv.set_if_absent("product_lock:1", "a", None).await.unwrap();
        assert!(matches!(kv.get("product_lock:1").await, Err(KvError::WrongType(_))));
        assert!(matches!(kv.incr_by("product_lock:1", 1).await, Err(KvError::WrongType(_))));
    }

    #[tokio::test]
    async fn stopped_actor_is_unavailable() {
        let kv = spawn_kv();
        kv.shutdown().await;
        tokio::task::yield_now().await;
        assert!(matches!(kv.get("stock:1").await, Err(KvError::Unavailable(_))));
    }
}
