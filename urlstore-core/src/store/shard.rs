//! Individual store shard
//!
//! Each shard owns a hash map behind its own reader/writer lock.

use parking_lot::RwLock;
use std::collections::HashMap;

/// One independently locked partition of the key space
#[derive(Debug, Default)]
pub struct Shard {
    map: RwLock<HashMap<String, String>>,
}

impl Shard {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Look up a key under a shared lock
    pub fn get(&self, key: &str) -> Option<String> {
        let map = self.map.read();
        map.get(key).cloned()
    }

    /// Insert only if the key is vacant.
    ///
    /// The presence check and the insert happen under one write guard, so
    /// concurrent callers for the same key cannot both see it vacant.
    pub fn set_if_absent(&self, key: &str, value: &str) -> bool {
        let mut map = self.map.write();
        if map.contains_key(key) {
            return false;
        }
        map.insert(key.to_owned(), value.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_first_writer_wins() {
        let shard = Shard::with_capacity(4);

        assert!(shard.set_if_absent("k", "first"));
        assert!(!shard.set_if_absent("k", "second"));
        assert_eq!(shard.get("k"), Some("first".to_string()));
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_shard_missing_key() {
        let shard = Shard::default();
        assert!(shard.is_empty());
        assert_eq!(shard.get("nope"), None);
    }
}
