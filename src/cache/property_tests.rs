//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check both facades against a naive reference LRU and to
//! exercise the footprint, recency and expiration guarantees.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{LruCache, LruStore};

// == Test Configuration ==
const TEST_CAPACITY: u64 = 256;

// == Strategies ==
/// Small key space so sequences revisit keys often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..48)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

// == Reference Model ==
/// Most recent first. Footprint is the value length; values are cloned
/// before being handed to a cache so capacity equals length.
#[derive(Debug, Default)]
struct ModelLru {
    entries: Vec<(String, Vec<u8>)>,
    capacity: u64,
}

impl ModelLru {
    fn new(capacity: u64) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    fn size(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v.len() as u64).sum()
    }

    fn set(&mut self, key: String, value: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }
        self.entries.retain(|(k, _)| *k != key);
        self.entries.insert(0, (key, value));
        while self.size() > self.capacity {
            self.entries.pop();
        }
    }

    fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos);
        let value = entry.1.clone();
        self.entries.insert(0, entry);
        Some(value)
    }

    fn delete(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        before != self.entries.len()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of operations the store behaves exactly like a naive
    // LRU over the same footprint budget.
    #[test]
    fn prop_store_matches_reference_model(
        capacity in 0u64..200,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let mut store = LruStore::new(capacity);
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(key.clone(), value.clone());
                    model.set(key, value);
                }
                CacheOp::Get { key } => {
                    let got = store.get(key.as_str()).map(|v| v.to_vec());
                    prop_assert_eq!(got, model.get(&key), "get({}) diverged", key);
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(key.as_str()), model.delete(&key));
                }
            }
            prop_assert_eq!(store.size(), model.size());
            prop_assert_eq!(store.len(), model.entries.len());
            prop_assert!(store.size() <= capacity);
        }
        store.debug_validate_invariants();
    }

    // The concurrent facade agrees with the model when driven from one thread.
    #[test]
    fn prop_cache_matches_reference_model(
        capacity in 0u64..200,
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let cache = LruCache::new(capacity);
        let mut model = ModelLru::new(capacity);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value.clone());
                    model.set(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(key.as_str()), model.get(&key));
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(key.as_str()), model.delete(&key));
                }
            }
            prop_assert_eq!(cache.size(), model.size());
            prop_assert!(cache.size() <= capacity);
        }
        cache.debug_validate_invariants();
    }

    // A key just written reads back unchanged.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let cache = LruCache::new(TEST_CAPACITY);

        cache.set(key.clone(), value.clone());

        prop_assert_eq!(cache.get(key.as_str()), Some(value));
    }

    // Writing a key twice keeps only the latest value and its footprint.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let cache = LruCache::new(TEST_CAPACITY);

        cache.set(key.clone(), value1);
        cache.set(key.clone(), value2.clone());

        prop_assert_eq!(cache.size(), value2.len() as u64);
        prop_assert_eq!(cache.get(key.as_str()), Some(value2));
        prop_assert_eq!(cache.len(), 1);
    }

    // Deleting a missing key changes neither size nor eviction order.
    #[test]
    fn prop_delete_missing_is_noop(
        keys in prop::collection::hash_set(key_strategy(), 2..6),
        missing in "[x-z]{1,3}"
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len() as u64;
        let mut store = LruStore::new(capacity);
        for key in &keys {
            store.set(key.clone(), vec![0]);
        }

        prop_assert!(!store.delete(missing.as_str()));
        prop_assert_eq!(store.size(), capacity);

        store.set("new".to_string(), vec![0]);
        prop_assert_eq!(store.get(keys[0].as_str()), None);
        for key in keys.iter().skip(1) {
            prop_assert!(store.get(key.as_str()).is_some());
        }
    }
}

// Property tests for LRU eviction behavior
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // When the cache is full, the entry accessed least recently is evicted.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec("[a-z]{1,8}", 3..10),
        new_key in "[A-Z]{1,8}",
        new_value in prop::collection::vec(any::<u8>(), 4..=4)
    ) {
        let unique_keys: Vec<String> = initial_keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique_keys.len() >= 2);

        // Each entry is four bytes; fill exactly to capacity
        let capacity = unique_keys.len() as u64 * 4;
        let cache = LruCache::new(capacity);

        let oldest_key = unique_keys[0].clone();
        for key in &unique_keys {
            cache.set(key.clone(), vec![0; 4]);
        }
        prop_assert_eq!(cache.size(), capacity);

        cache.set(new_key.clone(), new_value.clone());

        prop_assert_eq!(cache.size(), capacity);
        prop_assert!(cache.get(oldest_key.as_str()).is_none());
        prop_assert!(cache.get(new_key.as_str()).is_some());
        for key in unique_keys.iter().skip(1) {
            prop_assert!(cache.get(key.as_str()).is_some(), "{} should survive", key);
        }
    }

    // A read makes the key most recently used, shifting eviction to the next oldest.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec("[a-z]{1,8}", 3..8),
        new_key in "[A-Z]{1,8}"
    ) {
        let unique_keys: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique_keys.len() >= 3);

        let cache = LruCache::new(unique_keys.len() as u64);
        for key in &unique_keys {
            cache.set(key.clone(), vec![1]);
        }

        let accessed_key = unique_keys[0].clone();
        prop_assert!(cache.get(accessed_key.as_str()).is_some());

        cache.set(new_key.clone(), vec![2]);

        prop_assert!(cache.get(accessed_key.as_str()).is_some());
        prop_assert!(cache.get(unique_keys[1].as_str()).is_none());
        prop_assert!(cache.get(new_key.as_str()).is_some());
    }
}

// Separate proptest block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry written with a short ttl misses once the ttl has elapsed.
    #[test]
    fn prop_ttl_expiration_behavior(key in key_strategy(), value in value_strategy()) {
        let cache = LruCache::new(TEST_CAPACITY);

        cache.set_with_ttl(key.clone(), value.clone(), Duration::from_millis(30));
        prop_assert_eq!(cache.get(key.as_str()), Some(value));

        sleep(Duration::from_millis(80));

        prop_assert_eq!(cache.get(key.as_str()), None);
        prop_assert_eq!(cache.size(), 0);
    }
}

// Concurrent operation correctness
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Interleaved operations from many threads leave the list acyclic, the
    // index consistent and the footprint within capacity.
    #[test]
    fn prop_concurrent_operation_correctness(
        capacity in 1u64..200,
        partitions in 1usize..16,
        workloads in prop::collection::vec(
            prop::collection::vec(cache_op_strategy(), 10..80),
            2..6
        )
    ) {
        let config = crate::config::CacheConfig {
            partition_count: partitions,
            ..crate::config::CacheConfig::with_capacity(capacity)
        };
        let cache: Arc<LruCache> = Arc::new(LruCache::from_config(&config).unwrap());

        let handles: Vec<_> = workloads
            .into_iter()
            .map(|ops| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for op in ops {
                        match op {
                            CacheOp::Set { key, value } => cache.set(key, value),
                            CacheOp::Get { key } => {
                                let _ = cache.get(key.as_str());
                            }
                            CacheOp::Delete { key } => {
                                cache.delete(key.as_str());
                            }
                        }
                        assert!(cache.size() <= capacity);
                    }
                })
            })
            .collect();

        for handle in handles {
            prop_assert!(handle.join().is_ok(), "worker panicked");
        }

        prop_assert!(cache.size() <= capacity);
        cache.debug_validate_invariants();
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_evicts_lru() {
        let mut model = ModelLru::new(2);
        model.set("a".into(), vec![1]);
        model.set("b".into(), vec![1]);
        model.get("a");
        model.set("c".into(), vec![1]);

        assert!(model.get("b").is_none());
        assert!(model.get("a").is_some());
    }

    #[test]
    fn test_store_and_cache_agree_on_zero_length_values() {
        let mut store = LruStore::new(0);
        let cache = LruCache::new(0);
        store.set("k".to_string(), Vec::new());
        cache.set("k".to_string(), Vec::new());

        assert_eq!(store.get("k"), None);
        assert_eq!(cache.get("k"), None);

        let mut store = LruStore::new(1);
        store.set("k".to_string(), Vec::new());
        assert_eq!(store.get("k"), Some(&[][..]));
        assert_eq!(store.size(), 0);
    }
}
