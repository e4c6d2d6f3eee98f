//! Telemetry & Health
//!
//! Hit ratio and memory figures sourced from the backing store's own
//! counters, and a composite health status derived from fixed thresholds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::backend::{human_bytes, StoreInfo};
use crate::cache::CacheClient;
use crate::error::Result;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// == Hit Ratio ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitRatio {
    pub hit_ratio_percent: f64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_requests: u64,
    pub efficiency_rating: &'static str,
}

impl HitRatio {
    /// Zero requests report a 0% ratio.
    pub fn from_info(info: &StoreInfo) -> Self {
        let percent = round2(info.hit_rate() * 100.0);
        let efficiency_rating = if percent > 80.0 {
            "Excellent"
        } else if percent > 60.0 {
            "Good"
        } else {
            "Needs Improvement"
        };

        Self {
            hit_ratio_percent: percent,
            cache_hits: info.hits,
            cache_misses: info.misses,
            total_requests: info.total_requests(),
            efficiency_rating,
        }
    }
}

// == Memory Analysis ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryAnalysis {
    pub used_memory: u64,
    pub used_memory_human: String,
    /// 0 = unbounded
    pub max_memory: u64,
    pub utilization_percent: f64,
    pub total_keys: usize,
    pub average_key_size_bytes: f64,
    pub efficiency: &'static str,
    pub recommendations: Vec<String>,
}

impl MemoryAnalysis {
    /// Average entry size above which large values are flagged.
    const LARGE_ENTRY_BYTES: f64 = 1000.0;

    pub fn compute(info: &StoreInfo, total_keys: usize, thresholds: &HealthThresholds) -> Self {
        let utilization = if info.max_memory > 0 {
            round2(info.used_memory as f64 / info.max_memory as f64 * 100.0)
        } else {
            0.0
        };
        let average = if total_keys > 0 {
            round2(info.used_memory as f64 / total_keys as f64)
        } else {
            0.0
        };

        let mut recommendations = Vec::new();
        if info.max_memory == 0 {
            recommendations.push("No memory ceiling configured; set maxmemory with an eviction policy".to_string());
        }
        if utilization > thresholds.memory_warning_percent {
            recommendations.push(format!(
                "Memory utilization at {}%; shorten TTLs of large namespaces or raise the ceiling",
                utilization
            ));
        }
        if average >= Self::LARGE_ENTRY_BYTES {
            recommendations.push("Large average entry size; cache narrower projections".to_string());
        }

        Self {
            used_memory: info.used_memory,
            used_memory_human: human_bytes(info.used_memory),
            max_memory: info.max_memory,
            utilization_percent: utilization,
            total_keys,
            average_key_size_bytes: average,
            efficiency: if average < Self::LARGE_ENTRY_BYTES { "Good" } else { "Review Large Keys" },
            recommendations,
        }
    }
}

// == Health Thresholds ==
/// Limits for each health signal, in percent and milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthThresholds {
    pub hit_ratio_critical_percent: f64,
    pub hit_ratio_warning_percent: f64,
    pub memory_critical_percent: f64,
    pub memory_warning_percent: f64,
    pub ping_critical_ms: f64,
    pub ping_warning_ms: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            hit_ratio_critical_percent: 50.0,
            hit_ratio_warning_percent: 70.0,
            memory_critical_percent: 90.0,
            memory_warning_percent: 80.0,
            ping_critical_ms: 500.0,
            ping_warning_ms: 100.0,
        }
    }
}

// == Health Status ==
/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Evaluates each signal on its own and returns the worst status with one
/// issue per triggered threshold. A store that has served no lookups has a
/// 0% hit ratio.
pub fn assess(
    thresholds: &HealthThresholds,
    hit_ratio: f64,
    memory_percent: f64,
    ping_ms: f64,
) -> (HealthStatus, Vec<String>) {
    let mut status = HealthStatus::Healthy;
    let mut issues = Vec::new();
    let mut raise = |level: HealthStatus, issue: String| {
        status = status.max(level);
        issues.push(issue);
    };

    if hit_ratio < thresholds.hit_ratio_critical_percent {
        raise(HealthStatus::Critical, format!("Critical hit ratio: {}%", hit_ratio));
    } else if hit_ratio < thresholds.hit_ratio_warning_percent {
        raise(HealthStatus::Warning, format!("Low hit ratio: {}%", hit_ratio));
    }

    if memory_percent > thresholds.memory_critical_percent {
        raise(HealthStatus::Critical, format!("Critical memory usage: {}%", memory_percent));
    } else if memory_percent > thresholds.memory_warning_percent {
        raise(HealthStatus::Warning, format!("High memory usage: {}%", memory_percent));
    }

    if ping_ms > thresholds.ping_critical_ms {
        raise(HealthStatus::Critical, format!("Critical ping time: {:.2}ms", ping_ms));
    } else if ping_ms > thresholds.ping_warning_ms {
        raise(HealthStatus::Warning, format!("High ping time: {:.2}ms", ping_ms));
    }

    (status, issues)
}

// == Health Snapshot ==
/// Result of one health check. Produced fresh each time, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub ping_ms: f64,
    pub hit_ratio_percent: f64,
    pub memory_utilization_percent: f64,
    pub issues: Vec<String>,
    pub backend: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub connected_clients: u64,
    pub timestamp: DateTime<Utc>,
}

// == Telemetry Service ==
#[derive(Debug, Clone)]
pub struct Telemetry {
    client: CacheClient,
    thresholds: HealthThresholds,
}

impl Telemetry {
    pub fn new(client: CacheClient) -> Self {
        Self::with_thresholds(client, HealthThresholds::default())
    }

    pub fn with_thresholds(client: CacheClient, thresholds: HealthThresholds) -> Self {
        Self { client, thresholds }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    pub async fn hit_ratio(&self) -> Result<HitRatio> {
        let info = self.client.backend()?.info().await?;
        Ok(HitRatio::from_info(&info))
    }

    /// Memory figures; the key count covers this client's prefix only.
    pub async fn memory_analysis(&self) -> Result<MemoryAnalysis> {
        let backend = self.client.backend()?;
        let info = backend.info().await?;
        let keys = backend.scan(&self.client.policy().all_keys_pattern()).await?;
        Ok(MemoryAnalysis::compute(&info, keys.len(), &self.thresholds))
    }

    // == Health Check ==
    pub async fn health_check(&self) -> Result<HealthSnapshot> {
        let backend = self.client.backend()?;
        let ping = backend.ping().await?;
        let info = backend.info().await?;

        let ping_ms = round2(ping.as_secs_f64() * 1000.0);
        let hit_ratio = HitRatio::from_info(&info);
        let memory = MemoryAnalysis::compute(&info, 0, &self.thresholds);

        let (status, issues) = assess(
            &self.thresholds,
            hit_ratio.hit_ratio_percent,
            memory.utilization_percent,
            ping_ms,
        );
        debug!("Health check: {} ({} issues)", status.as_str(), issues.len());

        Ok(HealthSnapshot {
            status,
            ping_ms,
            hit_ratio_percent: hit_ratio.hit_ratio_percent,
            memory_utilization_percent: memory.utilization_percent,
            issues,
            backend: backend.name(),
            version: info.version,
            uptime_seconds: info.uptime_seconds,
            connected_clients: info.connected_clients,
            timestamp: Utc::now(),
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backend::{Backend, MemoryBackend};
    use crate::cache::{Environment, PolicyRegistry};
    use crate::error::CacheError;

    fn info(hits: u64, misses: u64, used: u64, max: u64) -> StoreInfo {
        StoreInfo {
            hits,
            misses,
            used_memory: used,
            max_memory: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_ratio_zero_requests() {
        let ratio = HitRatio::from_info(&info(0, 0, 0, 0));
        assert_eq!(ratio.hit_ratio_percent, 0.0);
        assert_eq!(ratio.total_requests, 0);
    }

    #[test]
    fn test_hit_ratio_rating() {
        assert_eq!(HitRatio::from_info(&info(9, 1, 0, 0)).efficiency_rating, "Excellent");
        assert_eq!(HitRatio::from_info(&info(7, 3, 0, 0)).efficiency_rating, "Good");
        assert_eq!(HitRatio::from_info(&info(1, 2, 0, 0)).hit_ratio_percent, 33.33);
    }

    #[test]
    fn test_memory_analysis() {
        let thresholds = HealthThresholds::default();
        let analysis = MemoryAnalysis::compute(&info(0, 0, 850, 1000), 10, &thresholds);
        assert_eq!(analysis.utilization_percent, 85.0);
        assert_eq!(analysis.average_key_size_bytes, 85.0);
        assert_eq!(analysis.efficiency, "Good");
        assert_eq!(analysis.recommendations.len(), 1);

        let unbounded = MemoryAnalysis::compute(&info(0, 0, 5000, 0), 0, &thresholds);
        assert_eq!(unbounded.utilization_percent, 0.0);
        assert_eq!(unbounded.average_key_size_bytes, 0.0);
    }

    #[test]
    fn test_low_hit_ratio_alone_is_critical() {
        let (status, issues) = assess(&HealthThresholds::default(), 40.0, 10.0, 1.0);
        assert_eq!(status, HealthStatus::Critical);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_mid_tier_hit_ratio_is_warning() {
        let (status, issues) = assess(&HealthThresholds::default(), 65.0, 50.0, 50.0);
        assert_eq!(status, HealthStatus::Warning);
        assert_eq!(issues, vec!["Low hit ratio: 65%".to_string()]);
    }

    #[test]
    fn test_worst_signal_wins() {
        let (status, issues) = assess(&HealthThresholds::default(), 65.0, 95.0, 150.0);
        assert_eq!(status, HealthStatus::Critical);
        assert_eq!(issues.len(), 3);

        let (status, issues) = assess(&HealthThresholds::default(), 85.0, 50.0, 50.0);
        assert_eq!(status, HealthStatus::Healthy);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let t = HealthThresholds::default();
        assert_eq!(assess(&t, 70.0, 80.0, 100.0).0, HealthStatus::Healthy);
        assert_eq!(assess(&t, 50.0, 90.0, 500.0).0, HealthStatus::Warning);
    }

    #[tokio::test]
    async fn test_health_check_against_memory_backend() {
        let backend = Arc::new(MemoryBackend::new().with_max_memory(1_000_000));
        let client = CacheClient::new(
            backend.clone(),
            PolicyRegistry::new(Environment::Development, "tele"),
        );
        backend.set("tele:orders:order:1", b"1", Duration::from_secs(60)).await.unwrap();
        for _ in 0..9 {
            backend.get("tele:orders:order:1").await.unwrap();
        }
        backend.get("tele:orders:order:2").await.unwrap();

        let telemetry = Telemetry::new(client);
        let snapshot = telemetry.health_check().await.unwrap();
        assert_eq!(snapshot.status, HealthStatus::Healthy);
        assert_eq!(snapshot.hit_ratio_percent, 90.0);
        assert_eq!(snapshot.backend, "memory");

        let memory = telemetry.memory_analysis().await.unwrap();
        assert_eq!(memory.total_keys, 1);
    }

    #[tokio::test]
    async fn test_fresh_store_reports_zero_hit_ratio_as_critical() {
        let client = CacheClient::new(
            Arc::new(MemoryBackend::new()),
            PolicyRegistry::new(Environment::Development, "fresh"),
        );

        let snapshot = Telemetry::new(client).health_check().await.unwrap();
        assert_eq!(snapshot.hit_ratio_percent, 0.0);
        assert_eq!(snapshot.status, HealthStatus::Critical);
        assert_eq!(snapshot.issues, vec!["Critical hit ratio: 0%".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let telemetry = Telemetry::new(CacheClient::disconnected(PolicyRegistry::new(
            Environment::Development,
            "x",
        )));
        assert!(matches!(telemetry.health_check().await, Err(CacheError::Unavailable)));
    }
}
