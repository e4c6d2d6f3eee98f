//! Cache Warmers
//!
//! Hooks that precompute hot values into the cache, used by the refresh loop
//! and by the warm admin operations.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheClient, CacheKey, Namespace};
use crate::models::WarmResult;

// == Warmer Trait ==
/// Source of values worth caching before anyone asks for them.
#[async_trait]
pub trait Warmer: Send + Sync {
    /// Name used in logs and warm reports.
    fn name(&self) -> &str;

    /// Namespaces this warmer writes to.
    fn namespaces(&self) -> &[Namespace];

    /// Writes values into the cache, returning how many were stored.
    async fn warm(&self, client: &CacheClient) -> anyhow::Result<usize>;
}

pub type SharedWarmer = Arc<dyn Warmer>;

type BoxFuture<V> = Pin<Box<dyn Future<Output = anyhow::Result<V>> + Send>>;

type ComputeFn<V> = Arc<dyn Fn() -> BoxFuture<V> + Send + Sync>;

// == Computed Warmer ==
/// Warmer that stores the result of one computation under one key.
pub struct ComputedWarmer<V> {
    name: String,
    namespace: [Namespace; 1],
    key: CacheKey,
    compute: ComputeFn<V>,
}

impl<V: 'static> ComputedWarmer<V> {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        namespace: Namespace,
        key: impl Into<CacheKey>,
        compute: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let compute: ComputeFn<V> = Arc::new(move || -> BoxFuture<V> { Box::pin(compute()) });
        Self {
            name: name.into(),
            namespace: [namespace],
            key: key.into(),
            compute,
        }
    }
}

#[async_trait]
impl<V> Warmer for ComputedWarmer<V>
where
    V: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn namespaces(&self) -> &[Namespace] {
        &self.namespace
    }

    async fn warm(&self, client: &CacheClient) -> anyhow::Result<usize> {
        let value = (self.compute)().await?;
        let stored = client.put(self.namespace[0], self.key.clone(), &value).await;
        Ok(usize::from(stored))
    }
}

// == Running Warmers ==
/// Runs every warmer (or those touching `only`) in order. A failing warmer
/// is recorded and the rest still run.
pub async fn run_warmers(
    warmers: &[SharedWarmer],
    client: &CacheClient,
    only: Option<Namespace>,
) -> WarmResult {
    let mut result = WarmResult::default();

    for warmer in warmers {
        if let Some(namespace) = only {
            if !warmer.namespaces().contains(&namespace) {
                continue;
            }
        }

        match warmer.warm(client).await {
            Ok(count) => {
                info!("Warmer {} stored {} entries", warmer.name(), count);
                result.warmed.insert(warmer.name().to_string(), count);
            }
            Err(e) => {
                warn!("Warmer {} failed: {:#}", warmer.name(), e);
                result.failures.push(format!("{}: {}", warmer.name(), e));
            }
        }
    }

    result
}
