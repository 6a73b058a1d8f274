use std::env;
use std::time::Duration;

const MAX_STOCK_TTL_SECS: u64 = 30 * 24 * 3600;
const MAX_LOCK_SECS: u64 = 3600;
const MAX_RETRY_INTERVAL_MS: u64 = 60_000;
const MAX_MAILBOX_SIZE: u64 = 65_536;

/// Tunables of the inventory core. Durations are read as whole seconds,
/// except the lock retry interval which is in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryConfig {
    /// Expiry of a cached stock entry, refreshed on every write.
    pub stock_ttl: Duration,
    /// How long a caller waits for a product lock before giving up.
    pub lock_wait: Duration,
    /// Lease renewed by the watchdog while a lock is held.
    pub watchdog_timeout: Duration,
    pub lock_retry_interval: Duration,
    pub mailbox_size: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            stock_ttl: Duration::from_secs(3600),
            lock_wait: Duration::from_secs(10),
            watchdog_timeout: Duration::from_secs(30),
            lock_retry_interval: Duration::from_millis(50),
            mailbox_size: 64,
        }
    }
}

impl InventoryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |name: &'static str, max: u64| -> Result<Option<u64>, ConfigError> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(value) if (1..=max).contains(&value) => Ok(Some(value)),
                    _ => Err(ConfigError::Invalid { name, value: raw, max }),
                },
            }
        };

        Ok(Self {
            stock_ttl: read("STOCK_CACHE_TTL_SECS", MAX_STOCK_TTL_SECS)?
                .map_or(defaults.stock_ttl, Duration::from_secs),
            lock_wait: read("LOCK_WAIT_SECS", MAX_LOCK_SECS)?
                .map_or(defaults.lock_wait, Duration::from_secs),
            watchdog_timeout: read("LOCK_WATCHDOG_TIMEOUT_SECS", MAX_LOCK_SECS)?
                .map_or(defaults.watchdog_timeout, Duration::from_secs),
            lock_retry_interval: read("LOCK_RETRY_INTERVAL_MS", MAX_RETRY_INTERVAL_MS)?
                .map_or(defaults.lock_retry_interval, Duration::from_millis),
            mailbox_size: read("ACTOR_MAILBOX_SIZE", MAX_MAILBOX_SIZE)?
                .map_or(defaults.mailbox_size, |size| size as usize),
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be an integer from 1 to {max}, got {value:?}")]
    Invalid { name: &'static str, value: String, max: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = InventoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, InventoryConfig::default());
        assert_eq!(config.stock_ttl, Duration::from_secs(3600));
        assert_eq!(config.lock_wait, Duration::from_secs(10));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = InventoryConfig::from_lookup(lookup(&[
            ("STOCK_CACHE_TTL_SECS", "60"),
            ("LOCK_RETRY_INTERVAL_MS", " 20 "),
            ("ACTOR_MAILBOX_SIZE", "8"),
        ])).unwrap();
        assert_eq!(config.stock_ttl, Duration::from_secs(60));
        assert_eq!(config.lock_retry_interval, Duration::from_millis(20));
        assert_eq!(config.mailbox_size, 8);
        assert_eq!(config.watchdog_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        assert_eq!(
            InventoryConfig::from_lookup(lookup(&[("LOCK_WAIT_SECS", "0")])),
            Err(ConfigError::Invalid { name: "LOCK_WAIT_SECS", value: "0".to_string(), max: 3600 })
        );
        assert!(InventoryConfig::from_lookup(lookup(&[("STOCK_CACHE_TTL_SECS", "soon")])).is_err());
    }

    #[test]
    fn values_past_their_bound_are_rejected() {
        assert_eq!(
            InventoryConfig::from_lookup(lookup(&[("STOCK_CACHE_TTL_SECS", "18446744073709551615")])),
            Err(ConfigError::Invalid {
                name: "STOCK_CACHE_TTL_SECS",
                value: "18446744073709551615".to_string(),
                max: 2_592_000,
            })
        );
        assert!(InventoryConfig::from_lookup(lookup(&[("LOCK_WATCHDOG_TIMEOUT_SECS", "3601")])).is_err());
        assert!(InventoryConfig::from_lookup(lookup(&[("ACTOR_MAILBOX_SIZE", "65537")])).is_err());

        let config = InventoryConfig::from_lookup(lookup(&[("STOCK_CACHE_TTL_SECS", "2592000")])).unwrap();
        assert_eq!(config.stock_ttl, Duration::from_secs(2_592_000));
    }
}
