//! In-Process Backend
//!
//! HashMap-backed store with lazy TTL expiry and Redis-like semantics. Used
//! when no Redis URL is configured (`memory://`) and throughout the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{glob_match, Backend, KeyTtl, StoreInfo, StoredEntry};
use crate::error::{CacheError, Result};

// == Memory Backend ==
/// In-process key-value store.
#[derive(Debug)]
pub struct MemoryBackend {
    /// Key-value storage
    entries: RwLock<HashMap<String, StoredEntry>>,
    /// Lookups that found a live entry
    hits: AtomicU64,
    /// Lookups that found nothing or an expired entry
    misses: AtomicU64,
    /// Reported memory ceiling in bytes, 0 = unbounded
    max_memory: AtomicU64,
    /// When set, every operation fails as if the store were unreachable
    offline: AtomicBool,
    started: Instant,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            max_memory: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    /// Sets the memory ceiling reported by `info`.
    pub fn with_max_memory(self, bytes: u64) -> Self {
        self.max_memory.store(bytes, Ordering::Relaxed);
        self
    }

    /// Simulates the store going away (true) or coming back (false).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Stores a value without an expiry, like a writer that forgot its TTL.
    pub async fn set_persistent(&self, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), StoredEntry::new(value.to_vec(), None));
        Ok(())
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Drops expired entries, returning how many were removed.
    async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    // == Get ==
    /// Expired entries are removed and counted as misses.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.value.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Overwrites any previous value and resets its TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredEntry::new(value.to_vec(), Some(ttl.as_secs())),
        );
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        self.ensure_online()?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        let removed = (before - entries.len()) as u64;
        debug!("Memory backend removed {} keys matching {}", removed, pattern);
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            Some(entry) if entry.is_expired() => KeyTtl::Missing,
            Some(entry) => entry.ttl(),
            None => KeyTtl::Missing,
        })
    }

    async fn ping(&self) -> Result<Duration> {
        self.ensure_online()?;
        let start = Instant::now();
        let _guard = self.entries.read().await;
        Ok(start.elapsed())
    }

    async fn info(&self) -> Result<StoreInfo> {
        self.ensure_online()?;
        self.purge_expired().await;
        let entries = self.entries.read().await;
        let used_memory = entries
            .iter()
            .map(|(key, entry)| entry.size_with_key(key))
            .sum();

        Ok(StoreInfo {
            used_memory,
            max_memory: self.max_memory.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            connected_clients: 1,
            version: format!("memory-{}", env!("CARGO_PKG_VERSION")),
            uptime_seconds: self.started.elapsed().as_secs(),
        })
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn memory_usage(&self, key: &str) -> Result<Option<u64>> {
        self.ensure_online()?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.size_with_key(key)))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryBackend::new();
        store.set("key1", b"value1", TTL).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_counts_miss() {
        let store = MemoryBackend::new();
        assert_eq!(store.get("nope").await.unwrap(), None);

        let info = store.info().await.unwrap();
        assert_eq!(info.misses, 1);
        assert_eq!(info.hits, 0);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = MemoryBackend::new();
        store.set("key1", b"value1", TTL).await.unwrap();
        store.set("key1", b"value2", TTL).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(b"value2".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryBackend::new();
        store.set("key1", b"value1", TTL).await.unwrap();

        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = MemoryBackend::new();
        store.set("key1", b"value1", Duration::from_secs(1)).await.unwrap();
        assert!(store.get("key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.get("key1").await.unwrap(), None);
        assert_eq!(store.ttl("key1").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_ttl_reporting() {
        let store = MemoryBackend::new();
        store.set("expiring", b"v", Duration::from_secs(60)).await.unwrap();
        store.set_persistent("forever", b"v").await.unwrap();

        assert_eq!(store.ttl("expiring").await.unwrap(), KeyTtl::Expiring(60));
        assert_eq!(store.ttl("forever").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(store.ttl("absent").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_delete_by_pattern() {
        let store = MemoryBackend::new();
        store.set("app:menu-items:item:1", b"a", TTL).await.unwrap();
        store.set("app:menu-items:item:2", b"b", TTL).await.unwrap();
        store.set("app:orders:order:1", b"c", TTL).await.unwrap();

        let removed = store.delete_by_pattern("app:menu-items:*").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.scan("app:*").await.unwrap(), vec!["app:orders:order:1"]);
    }

    #[tokio::test]
    async fn test_info_memory() {
        let store = MemoryBackend::new().with_max_memory(1000);
        store.set("abc", b"12345", TTL).await.unwrap();

        let info = store.info().await.unwrap();
        assert_eq!(info.used_memory, 8);
        assert_eq!(info.max_memory, 1000);
        assert_eq!(store.memory_usage("abc").await.unwrap(), Some(8));
        assert_eq!(store.memory_usage("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_offline_fails_every_operation() {
        let store = MemoryBackend::new();
        store.set_offline(true);

        assert!(matches!(store.get("k").await, Err(CacheError::Unavailable)));
        assert!(matches!(store.set("k", b"v", TTL).await, Err(CacheError::Unavailable)));
        assert!(matches!(store.ping().await, Err(CacheError::Unavailable)));

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }
}
