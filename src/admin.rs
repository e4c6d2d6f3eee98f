//! Administrative Operations
//!
//! Inspection and maintenance operations for operators. Every operation
//! answers with an [`AdminResponse`]; none of them return an error, and an
//! unreachable backing store is reported as `cache_unavailable`.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::backend::{human_bytes, KeyTtl};
use crate::cache::{CacheClient, Namespace};
use crate::error::Result;
use crate::invalidation::{describe_rules, EntityChange, InvalidationReport, Invalidator};
use crate::models::{
    AdminResponse, CacheInfo, CacheStats, ClearResult, DetailedStats, InvalidateRequest,
    NamespaceDetail, WarmResult,
};
use crate::tasks::{run_warmers, SharedWarmer};
use crate::telemetry::{HealthSnapshot, HitRatio, MemoryAnalysis, Telemetry};

/// Size assumed for a key whose memory usage the store cannot report.
const FALLBACK_ENTRY_BYTES: u64 = 100;

/// Wraps an operation result, logging failures.
fn respond<T>(operation: &str, result: Result<T>) -> AdminResponse<T> {
    match result {
        Ok(data) => AdminResponse::success(data),
        Err(e) => {
            warn!("Admin operation {} failed: {}", operation, e);
            AdminResponse::from_error(&e)
        }
    }
}

// == Cache Admin ==
pub struct CacheAdmin {
    client: CacheClient,
    telemetry: Telemetry,
    invalidator: Invalidator,
    warmers: Vec<SharedWarmer>,
}

impl CacheAdmin {
    pub fn new(client: CacheClient, telemetry: Telemetry, warmers: Vec<SharedWarmer>) -> Self {
        Self {
            invalidator: Invalidator::new(client.clone()),
            client,
            telemetry,
            warmers,
        }
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    // == Stats ==
    pub async fn stats(&self) -> AdminResponse<CacheStats> {
        respond("stats", self.collect_stats().await.map(|(stats, _)| stats))
    }

    /// Overview plus the full keys it was computed from.
    async fn collect_stats(&self) -> Result<(CacheStats, Vec<String>)> {
        let backend = self.client.backend()?;
        let policy = self.client.policy();
        let info = backend.info().await?;
        let keys = backend.scan(&policy.all_keys_pattern()).await?;

        let mut keys_by_namespace = BTreeMap::new();
        for key in &keys {
            if let Some(namespace) = policy.namespace_of(key) {
                *keys_by_namespace.entry(namespace.to_string()).or_insert(0) += 1;
            }
        }

        let stats = CacheStats {
            backend: backend.name(),
            total_keys: keys.len(),
            memory_usage: human_bytes(info.used_memory),
            connected_clients: info.connected_clients,
            cache_hits: info.hits,
            cache_misses: info.misses,
            hit_ratio_percent: HitRatio::from_info(&info).hit_ratio_percent,
            keys_by_namespace,
        };
        Ok((stats, keys))
    }

    /// Stats broken down per namespace, with per-key remaining TTL and a
    /// memory estimate.
    pub async fn detailed_stats(&self) -> AdminResponse<DetailedStats> {
        respond("detailed_stats", self.collect_detailed_stats().await)
    }

    async fn collect_detailed_stats(&self) -> Result<DetailedStats> {
        let (overview, keys) = self.collect_stats().await?;
        let backend = self.client.backend()?;
        let policy = self.client.policy();
        let version = backend.info().await?.version;

        let mut namespaces: BTreeMap<String, NamespaceDetail> = BTreeMap::new();
        let mut memory_estimate_bytes = 0;

        for key in &keys {
            let Some(name) = policy.namespace_of(key) else {
                continue;
            };
            let detail = namespaces.entry(name.to_string()).or_insert_with(|| NamespaceDetail {
                ttl_seconds: policy.ttl_for_name(name),
                ..NamespaceDetail::default()
            });
            detail.key_count += 1;

            if let KeyTtl::Expiring(seconds) = backend.ttl(key).await? {
                detail.ttl_remaining.insert(key.clone(), seconds);
            }

            let size = match backend.memory_usage(key).await {
                Ok(Some(bytes)) => bytes,
                _ => FALLBACK_ENTRY_BYTES + key.len() as u64,
            };
            detail.memory_estimate_bytes += size;
            memory_estimate_bytes += size;
        }

        Ok(DetailedStats {
            overview,
            memory_estimate_bytes,
            version,
            namespaces,
        })
    }

    // == Clearing ==
    /// Clears one namespace given by wire name.
    pub async fn clear_namespace(&self, name: &str) -> AdminResponse<ClearResult> {
        let namespace = match name.parse::<Namespace>() {
            Ok(namespace) => namespace,
            Err(e) => return AdminResponse::from_error(&e),
        };
        self.clear_group("clear_namespace", &[namespace]).await
    }

    /// Clears every key under this client's prefix.
    pub async fn clear_all(&self) -> AdminResponse<ClearResult> {
        let result = self.client.clear_all().await.map(|cleared_keys| ClearResult {
            cleared_keys,
            namespaces: Namespace::ALL.iter().map(|ns| ns.to_string()).collect(),
        });
        respond("clear_all", result)
    }

    pub async fn clear_search(&self) -> AdminResponse<ClearResult> {
        self.clear_group("clear_search", &Namespace::SEARCH).await
    }

    pub async fn clear_analytics(&self) -> AdminResponse<ClearResult> {
        self.clear_group("clear_analytics", &Namespace::ANALYTICS).await
    }

    async fn clear_group(&self, operation: &str, namespaces: &[Namespace]) -> AdminResponse<ClearResult> {
        let mut cleared_keys = 0;
        for namespace in namespaces {
            match self.client.clear_namespace(*namespace).await {
                Ok(removed) => cleared_keys += removed,
                Err(e) => return respond(operation, Err(e)),
            }
        }

        info!("{} cleared {} keys", operation, cleared_keys);
        AdminResponse::success(ClearResult {
            cleared_keys,
            namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        })
    }

    /// Deletes keys stored without an expiry.
    pub async fn clear_expired_keys(&self) -> AdminResponse<ClearResult> {
        let result = self
            .client
            .clear_keys_without_expiry()
            .await
            .map(|removed| ClearResult {
                cleared_keys: removed as u64,
                namespaces: Vec::new(),
            });
        respond("clear_expired_keys", result)
    }

    // == Warming ==
    /// Runs every registered warmer, or only those writing to `namespace`.
    pub async fn warm(&self, namespace: Option<&str>) -> AdminResponse<WarmResult> {
        let only = match namespace.map(str::parse::<Namespace>).transpose() {
            Ok(only) => only,
            Err(e) => return AdminResponse::from_error(&e),
        };
        if !self.client.is_available() {
            return AdminResponse::unavailable();
        }

        let result = run_warmers(&self.warmers, &self.client, only).await;
        if result.failures.is_empty() {
            AdminResponse::success(result)
        } else {
            let message = format!("{} warmers failed", result.failures.len());
            AdminResponse::success_with_message(message, result)
        }
    }

    // == Telemetry ==
    pub async fn hit_ratio(&self) -> AdminResponse<HitRatio> {
        respond("hit_ratio", self.telemetry.hit_ratio().await)
    }

    pub async fn memory_analysis(&self) -> AdminResponse<MemoryAnalysis> {
        respond("memory_analysis", self.telemetry.memory_analysis().await)
    }

    pub async fn health(&self) -> AdminResponse<HealthSnapshot> {
        respond("health", self.telemetry.health_check().await)
    }

    // == Invalidation ==
    /// Runs the cascade for an entity change reported over the admin surface.
    pub async fn invalidate(&self, request: &InvalidateRequest) -> AdminResponse<InvalidationReport> {
        if let Some(message) = request.validate() {
            return AdminResponse::invalid(message);
        }
        if !self.client.is_available() {
            return AdminResponse::unavailable();
        }

        let id = request.id.as_deref();
        let report = match EntityChange::from_notification(&request.entity, id) {
            Ok(Some(change)) => {
                let change = change
                    .with_related(request.customer_id.clone(), request.restaurant_id.clone());
                self.invalidator.apply(&change).await
            }
            Ok(None) => match self.invalidator.notify_changed(&request.entity, id).await {
                Ok(report) => report,
                Err(e) => return respond("invalidate", Err(e)),
            },
            Err(e) => return respond("invalidate", Err(e)),
        };

        if report.is_complete() {
            AdminResponse::success(report)
        } else {
            let message = format!("{} clear operations failed", report.failures.len());
            AdminResponse::success_with_message(message, report)
        }
    }

    // == Info ==
    /// Configuration overview. Served even without a backing store.
    pub async fn info(&self) -> AdminResponse<CacheInfo> {
        let policy = self.client.policy();
        let ttl_seconds = Namespace::ALL
            .iter()
            .map(|ns| (ns.to_string(), policy.ttl_for(*ns)))
            .collect();

        AdminResponse::success(CacheInfo {
            environment: policy.environment().to_string(),
            prefix: policy.prefix().to_string(),
            backend: self.client.backend().ok().map(|backend| backend.name()),
            available: self.client.is_available(),
            default_ttl: policy.default_ttl(),
            ttl_seconds,
            invalidation_rules: describe_rules(),
        })
    }
}
