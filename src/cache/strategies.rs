//! Caching Strategies
//!
//! Higher-order wrappers around an expensive compute callback. Every strategy
//! treats the cache as optional: store failures behave like misses, and the
//! callback's own error is returned unchanged.
//!
//! None of the strategies coalesce concurrent misses. Two callers missing the
//! same key at once both run their callback and the last write wins.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::backend::KeyTtl;
use crate::cache::{CacheClient, CacheKey, Namespace};

impl CacheClient {
    // == Cache-Aside ==
    /// Returns the cached value, or computes, stores and returns it.
    pub async fn cache_aside<V, E, F, Fut>(
        &self,
        namespace: Namespace,
        key: impl Into<CacheKey>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let full_key = self.full_key(namespace, &key.into());

        if let Some(value) = self.read(&full_key).await {
            debug!("Cache-aside HIT for {}", full_key);
            return Ok(value);
        }

        debug!("Cache-aside MISS for {}", full_key);
        let value = compute().await?;
        self.write(&full_key, &value, self.policy().ttl_duration(namespace))
            .await;
        Ok(value)
    }

    // == Write-Through ==
    /// Applies `update` to the durable store, then caches its result.
    ///
    /// The cache is untouched when `update` fails.
    pub async fn write_through<D, V, E, F, Fut>(
        &self,
        namespace: Namespace,
        key: impl Into<CacheKey>,
        data: D,
        update: F,
    ) -> Result<V, E>
    where
        V: Serialize,
        F: FnOnce(D) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let full_key = self.full_key(namespace, &key.into());
        let value = update(data).await?;

        if self
            .write(&full_key, &value, self.policy().ttl_duration(namespace))
            .await
        {
            info!("Write-through cache updated for {}", full_key);
        }
        Ok(value)
    }

    // == Conditional ==
    /// Always computes; stores the result only when `should_cache` accepts it.
    pub async fn conditional<V, E, F, Fut, P>(
        &self,
        namespace: Namespace,
        key: impl Into<CacheKey>,
        compute: F,
        should_cache: P,
    ) -> Result<V, E>
    where
        V: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        P: FnOnce(&V) -> bool,
    {
        let full_key = self.full_key(namespace, &key.into());
        let value = compute().await?;

        if should_cache(&value) {
            self.write(&full_key, &value, self.policy().ttl_duration(namespace))
                .await;
        } else {
            debug!("Conditional cache skipped {}", full_key);
        }
        Ok(value)
    }

    // == Refresh-Ahead ==
    /// Recomputes an entry whose remaining TTL has dropped below
    /// `threshold` of the namespace TTL, restoring the full TTL. Otherwise
    /// behaves like [`cache_aside`](Self::cache_aside). Callers without a
    /// tuned value pass [`DEFAULT_REFRESH_THRESHOLD`](crate::cache::DEFAULT_REFRESH_THRESHOLD).
    pub async fn refresh_ahead<V, E, F, Fut>(
        &self,
        namespace: Namespace,
        key: impl Into<CacheKey>,
        compute: F,
        threshold: f64,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let full_key = self.full_key(namespace, &key.into());
        let ttl = self.policy().ttl_duration(namespace);

        if !self.is_available() {
            return compute().await;
        }

        if let KeyTtl::Expiring(remaining) = self.ttl_of(&full_key).await {
            let limit = ttl.as_secs() as f64 * threshold;
            if remaining > 0 && (remaining as f64) < limit {
                info!("Refresh-ahead triggered for {} ({}s left)", full_key, remaining);
                let value = compute().await?;
                self.write(&full_key, &value, ttl).await;
                return Ok(value);
            }
        }

        if let Some(value) = self.read(&full_key).await {
            return Ok(value);
        }

        let value = compute().await?;
        self.write(&full_key, &value, ttl).await;
        Ok(value)
    }

    // == Two-Level ==
    /// Short-lived L1 in front of a long-lived L2. An L2 hit repopulates L1
    /// without recomputing; a double miss computes once and fills both.
    pub async fn two_level<V, E, F, Fut>(
        &self,
        l1: Namespace,
        l2: Namespace,
        key: impl Into<CacheKey>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = key.into();
        let l1_key = self.full_key(l1, &key.tiered("l1"));
        let l2_key = self.full_key(l2, &key.tiered("l2"));

        if let Some(value) = self.read(&l1_key).await {
            debug!("L1 cache HIT for {}", l1_key);
            return Ok(value);
        }

        if let Some(value) = self.read::<V>(&l2_key).await {
            debug!("L2 cache HIT for {}", l2_key);
            self.write(&l1_key, &value, self.policy().ttl_duration(l1))
                .await;
            return Ok(value);
        }

        debug!("Two-level cache MISS for {}", key.identifier);
        let value = compute().await?;
        self.write(&l1_key, &value, self.policy().ttl_duration(l1))
            .await;
        self.write(&l2_key, &value, self.policy().ttl_duration(l2))
            .await;
        Ok(value)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backend::{Backend, KeyTtl, MemoryBackend};
    use crate::cache::{
        CacheClient, CacheKey, Environment, Namespace, PolicyRegistry, DEFAULT_REFRESH_THRESHOLD,
    };

    fn client() -> (Arc<MemoryBackend>, CacheClient) {
        let backend = Arc::new(MemoryBackend::new());
        let policy = PolicyRegistry::new(Environment::Production, "test");
        (backend.clone(), CacheClient::new(backend, policy))
    }

    /// Compute callback that counts its invocations.
    fn counting(calls: &Arc<AtomicUsize>, value: u32) -> impl std::future::Future<Output = Result<u32, String>> {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test]
    async fn test_cache_aside_computes_once() {
        let (_, client) = client();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = client
            .cache_aside(Namespace::RestaurantDetail, "restaurant:7", || counting(&calls, 11))
            .await;
        let second = client
            .cache_aside(Namespace::RestaurantDetail, "restaurant:7", || counting(&calls, 99))
            .await;

        assert_eq!(first, Ok(11));
        assert_eq!(second, Ok(11));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_aside_uses_namespace_ttl() {
        let (_, client) = client();
        client
            .cache_aside(Namespace::OrderTracking, "order:9", || async { Ok::<_, String>(1u8) })
            .await
            .unwrap();

        assert_eq!(
            client.ttl_remaining(Namespace::OrderTracking, "order:9").await.unwrap(),
            KeyTtl::Expiring(120)
        );
    }

    #[tokio::test]
    async fn test_cache_aside_propagates_compute_error() {
        let (backend, client) = client();
        let result: Result<u32, String> = client
            .cache_aside(Namespace::Orders, "order:1", || async { Err("db down".to_string()) })
            .await;

        assert_eq!(result, Err("db down".to_string()));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_aside_falls_back_when_offline() {
        let (backend, client) = client();
        backend.set_offline(true);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let value = client
                .cache_aside(Namespace::Orders, "order:1", || counting(&calls, 5))
                .await;
            assert_eq!(value, Ok(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_aside_without_backend() {
        let client = CacheClient::disconnected(PolicyRegistry::new(Environment::Development, "x"));
        let value = client
            .cache_aside(Namespace::Orders, "order:1", || async { Ok::<_, String>(3) })
            .await;
        assert_eq!(value, Ok(3));
    }

    #[tokio::test]
    async fn test_write_through_caches_result() {
        let (_, client) = client();
        let saved = client
            .write_through(Namespace::Customers, "customer:3", "Ada", |name| async move {
                Ok::<_, String>(format!("{} Lovelace", name))
            })
            .await
            .unwrap();

        assert_eq!(saved, "Ada Lovelace");
        let cached: Option<String> = client.get(Namespace::Customers, "customer:3").await;
        assert_eq!(cached.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_write_through_failure_leaves_cache_alone() {
        let (_, client) = client();
        client.put(Namespace::Customers, "customer:3", &"old").await;

        let result: Result<String, String> = client
            .write_through(Namespace::Customers, "customer:3", "new", |_| async {
                Err("constraint violation".to_string())
            })
            .await;

        assert!(result.is_err());
        let cached: Option<String> = client.get(Namespace::Customers, "customer:3").await;
        assert_eq!(cached.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_conditional_respects_predicate() {
        let (backend, client) = client();
        let calls = Arc::new(AtomicUsize::new(0));

        let value = client
            .conditional(Namespace::OrderTracking, "order:1", || counting(&calls, 0), |v| *v > 0)
            .await;
        assert_eq!(value, Ok(0));
        assert!(backend.is_empty().await);

        client
            .conditional(Namespace::OrderTracking, "order:1", || counting(&calls, 2), |v| *v > 0)
            .await
            .unwrap();
        assert_eq!(client.get::<u32>(Namespace::OrderTracking, "order:1").await, Some(2));

        // Reads never short-circuit on a cached value
        client
            .conditional(Namespace::OrderTracking, "order:1", || counting(&calls, 3), |_| true)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refresh_ahead_recomputes_near_expiry() {
        let backend = Arc::new(MemoryBackend::new());
        let policy = PolicyRegistry::new(Environment::Production, "test")
            .with_ttl(Namespace::AnalyticsPopular, 100);
        let client = CacheClient::new(backend.clone(), policy);
        let key = client.full_key(Namespace::AnalyticsPopular, &"popular_items:7d".into());

        backend.set(&key, b"1", Duration::from_secs(20)).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let value = client
            .refresh_ahead(
                Namespace::AnalyticsPopular,
                "popular_items:7d",
                || counting(&calls, 2),
                DEFAULT_REFRESH_THRESHOLD,
            )
            .await;
        assert_eq!(value, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.ttl(&key).await.unwrap(), KeyTtl::Expiring(100));
    }

    #[tokio::test]
    async fn test_refresh_ahead_boundary_does_not_refresh() {
        let backend = Arc::new(MemoryBackend::new());
        let policy = PolicyRegistry::new(Environment::Production, "test")
            .with_ttl(Namespace::AnalyticsPopular, 100);
        let client = CacheClient::new(backend.clone(), policy);
        let key = client.full_key(Namespace::AnalyticsPopular, &"popular_items:7d".into());

        // Exactly 25% of the TTL left
        backend.set(&key, b"1", Duration::from_secs(25)).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let value = client
            .refresh_ahead(
                Namespace::AnalyticsPopular,
                "popular_items:7d",
                || counting(&calls, 2),
                DEFAULT_REFRESH_THRESHOLD,
            )
            .await;
        assert_eq!(value, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_ahead_miss_behaves_like_cache_aside() {
        let (_, client) = client();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let value = client
                .refresh_ahead(
                    Namespace::RestaurantAnalytics,
                    "restaurant:7",
                    || counting(&calls, 8),
                    DEFAULT_REFRESH_THRESHOLD,
                )
                .await;
            assert_eq!(value, Ok(8));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_level_serves_l2_after_l1_loss() {
        let (backend, client) = client();
        let calls = Arc::new(AtomicUsize::new(0));
        let (l1, l2) = (Namespace::RealtimeAvailability, Namespace::RestaurantDetail);

        let first = client.two_level(l1, l2, "restaurant:7", || counting(&calls, 4)).await;
        assert_eq!(first, Ok(4));
        assert_eq!(backend.len().await, 2);

        client.remove(l1, CacheKey::new("restaurant:7").tiered("l1")).await.unwrap();
        assert_eq!(backend.len().await, 1);

        let second = client.two_level(l1, l2, "restaurant:7", || counting(&calls, 5)).await;
        assert_eq!(second, Ok(4));
        assert_eq!(backend.len().await, 2);

        let third = client.two_level(l1, l2, "restaurant:7", || counting(&calls, 6)).await;
        assert_eq!(third, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_level_ttls() {
        let (_, client) = client();
        let (l1, l2) = (Namespace::RealtimeAvailability, Namespace::RestaurantDetail);
        client
            .two_level(l1, l2, "restaurant:7", || async { Ok::<_, String>(1) })
            .await
            .unwrap();

        let key = CacheKey::new("restaurant:7");
        assert_eq!(
            client.ttl_remaining(l1, key.tiered("l1")).await.unwrap(),
            KeyTtl::Expiring(60)
        );
        assert_eq!(
            client.ttl_remaining(l2, key.tiered("l2")).await.unwrap(),
            KeyTtl::Expiring(2400)
        );
    }
}
