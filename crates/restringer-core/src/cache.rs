//! Per-script bounded cache for rule results.
//!
//! Keys are `"<rule-name>:<blake3(fragment)>"`; values are either a
//! resolved replacement (kept as emitted source so entries stay detached
//! from any particular arena generation) or the BAD_VALUE marker, so
//! repeated failed evaluations stay cheap. The cache is flushed wholesale
//! when it grows past [`CACHE_CAPACITY`] and cleared when a new script is
//! loaded.

use rustc_hash::FxHashMap;
use tracing::debug;

pub const CACHE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Emitted source of a resolved replacement expression.
    Fragment(String),
    /// The evaluation failed; do not retry.
    Bad,
}

#[derive(Debug, Default)]
pub struct Cache {
    entries: FxHashMap<String, CacheEntry>,
}

/// Stable key for a code fragment under a given rule.
pub fn fragment_key(rule: &str, fragment: &str) -> String {
    format!("{rule}:{}", blake3::hash(fragment.as_bytes()).to_hex())
}

impl Cache {
    pub fn new() -> Self {
        Cache::default()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        if self.entries.len() >= CACHE_CAPACITY {
            // Conservative wholesale flush; per-entry LRU bookkeeping is
            // not worth it at this capacity.
            debug!(evicted = self.entries.len(), "cache over capacity, flushing");
            self.entries.clear();
        }
        self.entries.insert(key, entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_fragment_sensitive() {
        let a = fragment_key("resolve-local-calls", "f(1)");
        let b = fragment_key("resolve-local-calls", "f(1)");
        let c = fragment_key("resolve-local-calls", "f(2)");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("resolve-local-calls:"));
    }

    #[test]
    fn flushes_wholesale_at_capacity() {
        let mut cache = Cache::new();
        for i in 0..CACHE_CAPACITY {
            cache.insert(format!("k{i}"), CacheEntry::Bad);
        }
        assert_eq!(cache.len(), CACHE_CAPACITY);
        cache.insert("overflow".into(), CacheEntry::Bad);
        assert_eq!(cache.len(), 1, "expected wholesale flush");
        assert!(cache.get("overflow").is_some());
    }
}
