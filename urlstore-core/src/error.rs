//! Error types for the key registry

use thiserror::Error;

/// Errors surfaced by the store and its configuration.
///
/// A missing key or a key that is already taken are not errors; they are
/// reported through `Option` and `bool` results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Every candidate produced within the retry budget was already taken
    #[error("key space exhausted after {attempts} attempts")]
    KeySpaceExhausted { attempts: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
