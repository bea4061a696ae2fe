//! Candidate key generators
//!
//! Generators know nothing about which keys are already stored. Uniqueness is
//! enforced by [`UrlStore::set_if_absent`](crate::UrlStore::set_if_absent);
//! a generator only has to make collisions unlikely.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Digits used for base-62 key rendering
const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Default length of random keys
pub const DEFAULT_KEY_LENGTH: usize = 6;

/// Source of candidate keys
pub trait KeyGenerator: Send + Sync {
    /// Produce the next candidate key. Never fails.
    fn next_key(&self) -> String;
}

impl<F> KeyGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_key(&self) -> String {
        self()
    }
}

/// Random alphanumeric keys of a fixed length
#[derive(Debug, Clone)]
pub struct RandomKeyGenerator {
    length: usize,
}

impl RandomKeyGenerator {
    /// Keys are at least one character long; a `length` of 0 is raised to 1
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_LENGTH)
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn next_key(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Monotonic counter rendered in base 62
///
/// Produces "0", "1", ..., "z", "A", ..., "Z", "10", ... Keys never repeat
/// within one generator, so collisions only happen against keys inserted
/// through other paths.
#[derive(Debug, Default)]
pub struct SequentialKeyGenerator {
    counter: AtomicU64,
}

impl SequentialKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `start` instead of zero
    pub fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl KeyGenerator for SequentialKeyGenerator {
    fn next_key(&self) -> String {
        encode_base62(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

/// Render `n` using [`BASE62_ALPHABET`], most significant digit first
pub fn encode_base62(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();

    // Alphabet is ASCII
    digits.into_iter().map(char::from).collect()
}
