//! Backing Store Module
//!
//! Thin async interface over the remote key-value store, with a Redis
//! implementation and an in-process implementation for development and
//! tests. This is the only layer that touches the network.

mod entry;
mod glob;
mod memory;
mod redis_store;
mod stats;

pub use entry::{current_timestamp_ms, StoredEntry};
pub use glob::glob_match;
pub use memory::MemoryBackend;
pub use redis_store::{RedisBackend, RedisBackendConfig};
pub use stats::{human_bytes, StoreInfo};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

// == Key TTL ==
/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyTtl {
    /// Seconds until expiry
    Expiring(u64),
    /// Key exists without an expiry
    Persistent,
    /// Key does not exist
    Missing,
}

impl KeyTtl {
    /// Decodes the Redis `TTL` reply (-1 = no expiry, -2 = absent).
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => KeyTtl::Persistent,
            c if c < 0 => KeyTtl::Missing,
            c => KeyTtl::Expiring(c as u64),
        }
    }

    pub fn seconds(&self) -> Option<u64> {
        match self {
            KeyTtl::Expiring(secs) => Some(*secs),
            _ => None,
        }
    }
}

// == Backend Trait ==
/// Operations the cache engine needs from a key-value store.
///
/// Keys passed here are full keys; patterns are Redis-style globs.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Returns true when a key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Deletes every key matching the glob, returning how many were removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// Round-trip latency.
    async fn ping(&self) -> Result<Duration>;

    async fn info(&self) -> Result<StoreInfo>;

    /// Keys matching the glob.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Bytes attributed to a key, if the store can tell.
    async fn memory_usage(&self, key: &str) -> Result<Option<u64>>;
}

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn Backend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_codes() {
        assert_eq!(KeyTtl::from_code(-1), KeyTtl::Persistent);
        assert_eq!(KeyTtl::from_code(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_code(42), KeyTtl::Expiring(42));
        assert_eq!(KeyTtl::from_code(-7), KeyTtl::Missing);
        assert_eq!(KeyTtl::Expiring(0).seconds(), Some(0));
    }
}
