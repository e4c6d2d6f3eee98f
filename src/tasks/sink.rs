//! Health Sinks
//!
//! Destinations for the snapshots produced by the health-monitor loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::telemetry::{HealthSnapshot, HealthStatus};

/// Receives every health snapshot.
#[async_trait]
pub trait HealthSink: Send + Sync {
    async fn record(&self, snapshot: &HealthSnapshot);
}

pub type SharedSink = Arc<dyn HealthSink>;

// == Log Sink ==
/// Logs each snapshot at the severity of its status.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl HealthSink for LogSink {
    async fn record(&self, snapshot: &HealthSnapshot) {
        match snapshot.status {
            HealthStatus::Healthy => info!(
                "Cache healthy: ping {}ms, hit ratio {}%, memory {}%",
                snapshot.ping_ms, snapshot.hit_ratio_percent, snapshot.memory_utilization_percent
            ),
            HealthStatus::Warning => {
                warn!("Cache health warning: {}", snapshot.issues.join("; "))
            }
            HealthStatus::Critical => {
                error!("Cache health critical: {}", snapshot.issues.join("; "))
            }
        }
    }
}
