//! Redis Backend
//!
//! Redis implementation of [`Backend`] built on a multiplexed
//! `ConnectionManager`. Every call is bounded by the configured timeout so a
//! degraded server cannot stall request handling.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use tracing::{debug, info};

use crate::backend::{Backend, KeyTtl, StoreInfo};
use crate::error::{CacheError, Result};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

/// Keys deleted per DEL command.
const DELETE_BATCH: usize = 500;

// == Configuration ==
/// Redis connection settings.
#[derive(Debug, Clone)]
pub struct RedisBackendConfig {
    /// Connection URL
    pub url: String,
    /// Bound on connecting and on each command
    pub timeout: Duration,
}

impl Default for RedisBackendConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

// == Redis Backend ==
/// Backing store adapter for Redis.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisBackend {
    // == Constructor ==
    /// Connects to Redis, failing if the server is not reachable in time.
    pub async fn connect(config: &RedisBackendConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = tokio::time::timeout(config.timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout("connect".to_string()))??;

        info!("Redis backend connected to {}", config.url);

        Ok(Self {
            connection,
            timeout: config.timeout,
        })
    }

    /// Runs one command against a cloned connection handle, under timeout.
    async fn run<T, F, Fut>(&self, op: &str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, command(self.connection.clone())).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(op.to_string())),
        }
    }
}

#[async_trait]
impl Backend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.run("get", |mut conn| async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<Vec<u8>>>(&mut conn)
                .await
        })
        .await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // SET with EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);
        self.run("set", |mut conn| async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(seconds)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed: i64 = self
            .run("del", |mut conn| async move {
                redis::cmd("DEL").arg(key).query_async(&mut conn).await
            })
            .await?;
        Ok(removed > 0)
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        let keys = self.scan(pattern).await?;
        let mut removed = 0u64;

        for chunk in keys.chunks(DELETE_BATCH) {
            let count: i64 = self
                .run("del", |mut conn| async move {
                    redis::cmd("DEL").arg(chunk).query_async(&mut conn).await
                })
                .await?;
            removed += count.max(0) as u64;
        }

        debug!("Redis removed {} keys matching {}", removed, pattern);
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let code: i64 = self
            .run("ttl", |mut conn| async move {
                redis::cmd("TTL").arg(key).query_async(&mut conn).await
            })
            .await?;
        Ok(KeyTtl::from_code(code))
    }

    async fn ping(&self) -> Result<Duration> {
        let start = Instant::now();
        let _pong: String = self
            .run("ping", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(start.elapsed())
    }

    async fn info(&self) -> Result<StoreInfo> {
        let raw: String = self
            .run("info", |mut conn| async move {
                redis::cmd("INFO").query_async(&mut conn).await
            })
            .await?;
        Ok(StoreInfo::from_redis_info(&raw))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = self
                .run("scan", |mut conn| async move {
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await
                })
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn memory_usage(&self, key: &str) -> Result<Option<u64>> {
        self.run("memory usage", |mut conn| async move {
            redis::cmd("MEMORY")
                .arg("USAGE")
                .arg(key)
                .query_async::<_, Option<u64>>(&mut conn)
                .await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> RedisBackend {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        RedisBackend::connect(&RedisBackendConfig {
            url,
            timeout: Duration::from_secs(2),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_refused_is_unavailable() {
        let config = RedisBackendConfig {
            url: "redis://127.0.0.1:1".to_string(),
            timeout: Duration::from_millis(500),
        };
        let err = RedisBackend::connect(&config).await.err().unwrap();
        assert!(err.is_unavailable(), "unexpected error: {}", err);
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis server
    async fn test_basic_operations() {
        let redis = connect().await;
        let key = "delivery-test:orders:order:1";

        redis.set(key, b"value", Duration::from_secs(60)).await.unwrap();
        assert_eq!(redis.get(key).await.unwrap(), Some(b"value".to_vec()));
        assert!(matches!(redis.ttl(key).await.unwrap(), KeyTtl::Expiring(_)));

        assert!(redis.delete(key).await.unwrap());
        assert_eq!(redis.ttl(key).await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis server
    async fn test_delete_by_pattern() {
        let redis = connect().await;
        for i in 0..5 {
            let key = format!("delivery-test:menu-items:item:{}", i);
            redis.set(&key, b"v", Duration::from_secs(60)).await.unwrap();
        }

        let removed = redis.delete_by_pattern("delivery-test:menu-items:*").await.unwrap();
        assert_eq!(removed, 5);
        assert!(redis.scan("delivery-test:menu-items:*").await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis server
    async fn test_ping_and_info() {
        let redis = connect().await;
        assert!(redis.ping().await.unwrap() < Duration::from_secs(2));
        assert!(!redis.info().await.unwrap().version.is_empty());
    }
}
