//! urlstore core - concurrent in-memory key registry
//!
//! This crate provides:
//! - A sharded, reader/writer locked key→value store with an atomic
//!   insert-if-absent contract
//! - Candidate key generators (random and sequential)
//! - Configuration and logging setup shared by front ends

pub mod config;
pub mod error;
pub mod keygen;
pub mod logging;
pub mod store;

pub use config::*;
pub use error::{Result, StoreError};
pub use keygen::*;
pub use logging::{init_logging, LoggingConfig};
pub use store::*;
