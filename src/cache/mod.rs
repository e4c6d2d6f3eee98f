//! Cache Module
//!
//! Namespace policy, key construction and the caching strategies built on
//! top of a backing store.

mod client;
mod key;
mod namespace;
mod policy;
mod strategies;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use client::CacheClient;
pub use key::{CacheKey, Scope};
pub use namespace::{Environment, Namespace};
pub use policy::{escape_glob, PolicyRegistry, TtlClass, TtlTable};

/// Fraction of the TTL below which refresh-ahead recomputes an entry.
pub const DEFAULT_REFRESH_THRESHOLD: f64 = 0.25;
