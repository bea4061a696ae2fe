//! Concurrency tests for the key registry
//!
//! Races many threads against one store and checks that inserts stay
//! first-writer-wins and that generated keys never double up.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use urlstore_core::{SequentialKeyGenerator, StoreConfig, UrlStore};

const THREADS: usize = 16;

#[test]
fn test_same_key_race_has_one_winner() {
    for num_shards in [1, 16] {
        let config = StoreConfig {
            num_shards,
            ..Default::default()
        };
        let store = Arc::new(
            UrlStore::with_config(&config, Arc::new(SequentialKeyGenerator::new())).unwrap(),
        );
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let value = format!("value_{}", i);
                    barrier.wait();
                    (value.clone(), store.set_if_absent("contested", &value))
                })
            })
            .collect();

        let results: Vec<(String, bool)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners: Vec<&String> = results
            .iter()
            .filter(|(_, inserted)| *inserted)
            .map(|(value, _)| value)
            .collect();
        assert_eq!(winners.len(), 1, "exactly one caller should insert");

        let readers: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || store.get("contested"))
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap().as_ref(), Some(winners[0]));
        }
        assert_eq!(store.len(), 1);
    }
}

#[test]
fn test_concurrent_puts_with_distinct_keys() {
    let store = Arc::new(UrlStore::new(SequentialKeyGenerator::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let store = store.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let value = format!("https://example.com/{}", i);
                barrier.wait();
                let key = store.put(&value).unwrap();
                (key, value)
            })
        })
        .collect();

    let results: Vec<(String, String)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let keys: HashSet<&String> = results.iter().map(|(key, _)| key).collect();
    assert_eq!(keys.len(), THREADS);

    for (key, value) in &results {
        assert_eq!(store.get(key).as_ref(), Some(value));
    }
    assert_eq!(store.stats().collisions, 0);
}

#[test]
fn test_concurrent_puts_with_random_keys() {
    let store = Arc::new(UrlStore::new(urlstore_core::RandomKeyGenerator::default()));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                (0..200)
                    .map(|i| {
                        let value = format!("{}-{}", t, i);
                        (store.put(&value).unwrap(), value)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for (key, value) in handle.join().unwrap() {
            assert!(seen.insert(key.clone()), "key {} handed out twice", key);
            assert_eq!(store.get(&key), Some(value));
        }
    }
    assert_eq!(store.len(), THREADS * 200);
}

#[test]
fn test_readers_during_writes() {
    let store = Arc::new(UrlStore::new(SequentialKeyGenerator::new()));
    for i in 0..100 {
        store.set_if_absent(&format!("stable_{}", i), "fixed");
    }

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..2000 {
                store.set_if_absent(&format!("new_{}", i), "fresh");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..2000 {
                    let key = format!("stable_{}", i % 100);
                    assert_eq!(store.get(&key).as_deref(), Some("fixed"));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.len(), 2100);
}
