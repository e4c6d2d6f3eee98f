//! Stored Entry Module
//!
//! A single value held by the in-process backend, with its expiry.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::KeyTtl;

// == Stored Entry ==
/// A value and its expiration metadata.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Serialized value
    pub value: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = persistent
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates an entry that expires after `ttl_seconds`, or never when None.
    pub fn new(value: Vec<u8>, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            expires_at: ttl_seconds.map(|ttl| now + ttl * 1000),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds; None for persistent entries.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Remaining TTL rounded to the nearest second, the way Redis reports
    /// `TTL`.
    pub fn ttl(&self) -> KeyTtl {
        match self.ttl_remaining_ms() {
            Some(ms) => KeyTtl::Expiring((ms + 500) / 1000),
            None => KeyTtl::Persistent,
        }
    }

    /// Approximate footprint of key and value.
    pub fn size_with_key(&self, key: &str) -> u64 {
        (key.len() + self.value.len()) as u64
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
