//! Key registry with sharding
//!
//! Keys are spread across independently locked shards by hash. Readers of a
//! shard run in parallel; a writer holds the shard exclusively for its
//! check-then-insert window. With a single shard this is one coarse lock over
//! the whole map.

pub mod shard;

pub use shard::Shard;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::keygen::KeyGenerator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Concurrent key→value registry with collision-safe key generation.
///
/// Created empty, owned by the caller and shared by `Arc`. Entries are only
/// ever added; nothing is overwritten or removed.
pub struct UrlStore {
    shards: Box<[Shard]>,
    /// Mask for shard selection (num_shards - 1)
    shard_mask: u64,
    max_attempts: u32,
    generator: Arc<dyn KeyGenerator>,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    lookups: AtomicU64,
    hits: AtomicU64,
    inserts: AtomicU64,
    collisions: AtomicU64,
    exhausted: AtomicU64,
}

impl UrlStore {
    /// Create a store with default settings
    pub fn new(generator: impl KeyGenerator + 'static) -> Self {
        Self::build(&StoreConfig::default(), Arc::new(generator))
    }

    /// Create a store from validated settings
    pub fn with_config(config: &StoreConfig, generator: Arc<dyn KeyGenerator>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, generator))
    }

    fn build(config: &StoreConfig, generator: Arc<dyn KeyGenerator>) -> Self {
        let shards = (0..config.num_shards)
            .map(|_| Shard::with_capacity(config.initial_capacity_per_shard))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            shard_mask: (config.num_shards - 1) as u64,
            max_attempts: config.max_attempts,
            generator,
            counters: Counters::default(),
        }
    }

    /// Look up the value stored under `key`.
    ///
    /// Returns `None` for keys that were never inserted.
    pub fn get(&self, key: &str) -> Option<String> {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);

        let value = self.shard_for(key).get(key);
        if value.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Store `value` under `key` unless the key is already taken.
    ///
    /// Returns `true` if this call inserted the pair. On `false` the existing
    /// value is left untouched. Among concurrent callers for one key exactly
    /// one gets `true`.
    pub fn set_if_absent(&self, key: &str, value: &str) -> bool {
        let inserted = self.shard_for(key).set_if_absent(key, value);

        if inserted {
            self.counters.inserts.fetch_add(1, Ordering::Relaxed);
            trace!(key, "inserted entry");
        } else {
            self.counters.collisions.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Store `value` under a freshly generated key and return the key.
    ///
    /// Candidates are drawn from the generator until one inserts. Empty
    /// candidates count as failed attempts and are never stored. Gives up
    /// with [`StoreError::KeySpaceExhausted`] after `max_attempts` failures;
    /// failed attempts leave the map unchanged.
    pub fn put(&self, value: &str) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.generator.next_key();
            if candidate.is_empty() {
                debug!(attempt, "generator produced an empty key, retrying");
                continue;
            }
            if self.set_if_absent(&candidate, value) {
                return Ok(candidate);
            }
            debug!(attempt, candidate = %candidate, "generated key collided, retrying");
        }

        self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        warn!(
            attempts = self.max_attempts,
            "no free key found within retry budget"
        );
        Err(StoreError::KeySpaceExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Get statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_keys: self.len() as u64,
            lookups: self.counters.lookups.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            collisions: self.counters.collisions.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
            num_shards: self.shards.len() as u64,
        }
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let idx = hash_key(key) & self.shard_mask;
        &self.shards[idx as usize]
    }
}

impl std::fmt::Debug for UrlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlStore")
            .field("num_shards", &self.shards.len())
            .field("max_attempts", &self.max_attempts)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// FNV-1a hash used for shard selection
fn hash_key(key: &str) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in key.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub total_keys: u64,
    pub lookups: u64,
    pub hits: u64,
    pub inserts: u64,
    /// `set_if_absent` calls that found the key taken, including retries
    /// inside `put`
    pub collisions: u64,
    /// `put` calls that ran out of attempts
    pub exhausted: u64,
    pub num_shards: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::SequentialKeyGenerator;

    fn store() -> UrlStore {
        UrlStore::new(SequentialKeyGenerator::new())
    }

    #[test]
    fn test_get_missing() {
        let store = store();
        assert_eq!(store.get("missing"), None);
        assert_eq!(store.get(""), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_if_absent_round_trip() {
        let store = store();

        assert!(store.set_if_absent("go", "https://go.dev"));
        assert_eq!(store.get("go"), Some("https://go.dev".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_if_absent_keeps_first_value() {
        let store = store();

        assert!(store.set_if_absent("k", "v1"));
        assert!(!store.set_if_absent("k", "v2"));
        assert!(!store.set_if_absent("k", "v1"));
        assert_eq!(store.get("k"), Some("v1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_key_and_value() {
        let store = store();

        assert!(store.set_if_absent("", ""));
        assert_eq!(store.get(""), Some(String::new()));
        assert!(!store.set_if_absent("", "other"));
    }

    #[test]
    fn test_put_returns_present_key() {
        let store = store();

        let key = store.put("https://example.com").unwrap();
        assert!(!key.is_empty());
        assert_eq!(store.get(&key), Some("https://example.com".to_string()));
    }

    #[test]
    fn test_put_skips_taken_keys() {
        let store = store();
        assert!(store.set_if_absent("0", "taken"));
        assert!(store.set_if_absent("1", "taken"));

        let key = store.put("fresh").unwrap();
        assert_eq!(key, "2");
        assert_eq!(store.get("0"), Some("taken".to_string()));

        let stats = store.stats();
        assert_eq!(stats.collisions, 2);
        assert_eq!(stats.inserts, 3);
    }

    #[test]
    fn test_put_exhausts_with_constant_generator() {
        let config = StoreConfig {
            max_attempts: 5,
            ..Default::default()
        };
        let store = UrlStore::with_config(&config, Arc::new(|| "same".to_string())).unwrap();

        assert_eq!(store.put("a").unwrap(), "same");
        assert_eq!(
            store.put("b"),
            Err(StoreError::KeySpaceExhausted { attempts: 5 })
        );
        assert_eq!(store.get("same"), Some("a".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().exhausted, 1);
    }

    #[test]
    fn test_put_never_returns_empty_key() {
        let config = StoreConfig {
            max_attempts: 3,
            ..Default::default()
        };
        let store = UrlStore::with_config(&config, Arc::new(|| String::new())).unwrap();

        assert_eq!(
            store.put("https://example.com"),
            Err(StoreError::KeySpaceExhausted { attempts: 3 })
        );
        assert!(store.is_empty());
        assert_eq!(store.get(""), None);
    }

    #[test]
    fn test_put_with_zero_length_random_keys() {
        let store = UrlStore::new(crate::keygen::RandomKeyGenerator::new(0));

        let key = store.put("https://example.com").unwrap();
        assert!(!key.is_empty());
        assert_eq!(store.get(&key).as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_single_shard() {
        let config = StoreConfig {
            num_shards: 1,
            ..Default::default()
        };
        let store = UrlStore::with_config(&config, Arc::new(SequentialKeyGenerator::new())).unwrap();

        for i in 0..100 {
            assert!(store.set_if_absent(&format!("key_{}", i), "v"));
        }
        assert_eq!(store.num_shards(), 1);
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StoreConfig {
            num_shards: 3,
            ..Default::default()
        };
        let result = UrlStore::with_config(&config, Arc::new(SequentialKeyGenerator::new()));
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_stats() {
        let store = store();
        store.set_if_absent("a", "1");
        store.get("a");
        store.get("b");

        let stats = store.stats();
        assert_eq!(stats.total_keys, 1);
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.num_shards, 16);
    }

    #[test]
    fn test_hash_key_spreads_keys() {
        let store = store();
        for i in 0..1000 {
            store.set_if_absent(&format!("key_{}", i), "v");
        }
        assert!(store.shards.iter().all(|shard| !shard.is_empty()));
    }
}
