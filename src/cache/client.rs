//! Cache Client Module
//!
//! Couples an optional backing store with the policy registry. Reads and
//! writes issued through the client are best-effort: failures are logged and
//! reported as "absent" so callers can fall back to computing the value.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{KeyTtl, SharedBackend};
use crate::cache::{CacheKey, Namespace, PolicyRegistry, Scope};
use crate::error::{CacheError, Result};

// == Cache Client ==
/// Handle used by strategies, invalidation and admin operations.
///
/// Cloning is cheap; clones share the backend and the registry.
#[derive(Clone)]
pub struct CacheClient {
    /// None while the backing store is not initialized
    backend: Option<SharedBackend>,
    policy: Arc<PolicyRegistry>,
}

impl CacheClient {
    // == Constructors ==
    pub fn new(backend: SharedBackend, policy: PolicyRegistry) -> Self {
        Self {
            backend: Some(backend),
            policy: Arc::new(policy),
        }
    }

    /// Client without a backing store. Every strategy computes directly.
    pub fn disconnected(policy: PolicyRegistry) -> Self {
        Self {
            backend: None,
            policy: Arc::new(policy),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn policy(&self) -> &PolicyRegistry {
        &self.policy
    }

    /// The backing store, or `Unavailable` when not initialized.
    pub fn backend(&self) -> Result<&SharedBackend> {
        self.backend.as_ref().ok_or(CacheError::Unavailable)
    }

    /// Full key for a namespace and logical key.
    pub fn full_key(&self, namespace: Namespace, key: &CacheKey) -> String {
        self.policy.build_key(namespace, key)
    }

    // == Best-Effort Access ==
    /// Reads and decodes a value. Store errors and undecodable payloads are
    /// logged and reported as a miss.
    pub(crate) async fn read<V: DeserializeOwned>(&self, full_key: &str) -> Option<V> {
        let backend = self.backend.as_ref()?;

        let bytes = match backend.get(full_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", full_key, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", full_key, e);
                None
            }
        }
    }

    /// Encodes and stores a value. Returns false if nothing was written.
    pub(crate) async fn write<V: Serialize>(&self, full_key: &str, value: &V, ttl: Duration) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot encode value for {}: {}", full_key, e);
                return false;
            }
        };

        match backend.set(full_key, &bytes, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cache write failed for {}: {}", full_key, e);
                false
            }
        }
    }

    /// Remaining TTL of a full key; store errors read as `Missing`.
    pub(crate) async fn ttl_of(&self, full_key: &str) -> KeyTtl {
        let Some(backend) = self.backend.as_ref() else {
            return KeyTtl::Missing;
        };
        match backend.ttl(full_key).await {
            Ok(ttl) => ttl,
            Err(e) => {
                warn!("Cache ttl lookup failed for {}: {}", full_key, e);
                KeyTtl::Missing
            }
        }
    }

    /// Looks up a cached value without computing anything on a miss.
    pub async fn get<V: DeserializeOwned>(&self, namespace: Namespace, key: impl Into<CacheKey>) -> Option<V> {
        let full_key = self.full_key(namespace, &key.into());
        self.read(&full_key).await
    }

    /// Stores a value with the namespace TTL.
    pub async fn put<V: Serialize>(&self, namespace: Namespace, key: impl Into<CacheKey>, value: &V) -> bool {
        let full_key = self.full_key(namespace, &key.into());
        self.write(&full_key, value, self.policy.ttl_duration(namespace)).await
    }

    // == Clearing ==
    /// Deletes a single logical key.
    pub async fn remove(&self, namespace: Namespace, key: impl Into<CacheKey>) -> Result<bool> {
        let full_key = self.full_key(namespace, &key.into());
        self.backend()?.delete(&full_key).await
    }

    /// Deletes every key in a namespace.
    pub async fn clear_namespace(&self, namespace: Namespace) -> Result<u64> {
        let pattern = self.policy.namespace_pattern(namespace);
        let removed = self.backend()?.delete_by_pattern(&pattern).await?;
        info!("Cleared {} keys from namespace {}", removed, namespace);
        Ok(removed)
    }

    /// Deletes the keys of a namespace tied to one entity.
    pub async fn clear_scoped(&self, namespace: Namespace, scope: &Scope) -> Result<u64> {
        let backend = self.backend()?;
        let mut removed = 0;
        for pattern in self.policy.scoped_patterns(namespace, scope) {
            removed += backend.delete_by_pattern(&pattern).await?;
        }
        debug!("Cleared {} keys for {} in namespace {}", removed, scope, namespace);
        Ok(removed)
    }

    /// Deletes every key under this client's prefix. Keys owned by other
    /// applications sharing the store are left alone.
    pub async fn clear_all(&self) -> Result<u64> {
        let pattern = self.policy.all_keys_pattern();
        let removed = self.backend()?.delete_by_pattern(&pattern).await?;
        info!("Cleared {} keys under prefix {}", removed, self.policy.prefix());
        Ok(removed)
    }

    /// Deletes keys under the prefix that were stored without an expiry.
    pub async fn clear_keys_without_expiry(&self) -> Result<usize> {
        let backend = self.backend()?;
        let keys = backend.scan(&self.policy.all_keys_pattern()).await?;

        let mut removed = 0;
        for key in keys {
            if backend.ttl(&key).await? == KeyTtl::Persistent && backend.delete(&key).await? {
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Removed {} keys without expiry", removed);
        }
        Ok(removed)
    }

    /// Remaining TTL of a logical key.
    pub async fn ttl_remaining(&self, namespace: Namespace, key: impl Into<CacheKey>) -> Result<KeyTtl> {
        let full_key = self.full_key(namespace, &key.into());
        self.backend()?.ttl(&full_key).await
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("prefix", &self.policy.prefix())
            .finish()
    }
}
