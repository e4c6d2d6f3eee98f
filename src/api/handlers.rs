//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. Handlers delegate to
//! [`CacheAdmin`] and serve its envelope with the matching status code.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::admin::CacheAdmin;
use crate::invalidation::InvalidationReport;
use crate::models::{
    AdminResponse, CacheInfo, CacheStats, ClearResult, DetailedStats, HealthResponse,
    InvalidateRequest, WarmResult,
};
use crate::telemetry::{HealthSnapshot, HitRatio, MemoryAnalysis};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub admin: Arc<CacheAdmin>,
}

impl AppState {
    pub fn new(admin: CacheAdmin) -> Self {
        Self {
            admin: Arc::new(admin),
        }
    }
}

/// Handler for GET /health
///
/// Liveness of the service itself; answers even when the cache is down.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.admin.client().is_available()))
}

// == Stats ==
/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> AdminResponse<CacheStats> {
    state.admin.stats().await
}

/// Handler for GET /cache/stats/detailed
pub async fn detailed_stats_handler(State(state): State<AppState>) -> AdminResponse<DetailedStats> {
    state.admin.detailed_stats().await
}

// == Clearing ==
/// Handler for DELETE /cache/clear
pub async fn clear_all_handler(State(state): State<AppState>) -> AdminResponse<ClearResult> {
    state.admin.clear_all().await
}

/// Handler for DELETE /cache/namespaces/:namespace
pub async fn clear_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> AdminResponse<ClearResult> {
    state.admin.clear_namespace(&namespace).await
}

/// Handler for DELETE /cache/clear/search
pub async fn clear_search_handler(State(state): State<AppState>) -> AdminResponse<ClearResult> {
    state.admin.clear_search().await
}

/// Handler for DELETE /cache/clear/analytics
pub async fn clear_analytics_handler(State(state): State<AppState>) -> AdminResponse<ClearResult> {
    state.admin.clear_analytics().await
}

/// Handler for DELETE /cache/clear/expired
pub async fn clear_expired_handler(State(state): State<AppState>) -> AdminResponse<ClearResult> {
    state.admin.clear_expired_keys().await
}

// == Warming ==
/// Handler for POST /cache/warm
pub async fn warm_all_handler(State(state): State<AppState>) -> AdminResponse<WarmResult> {
    state.admin.warm(None).await
}

/// Handler for POST /cache/warm/:namespace
pub async fn warm_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> AdminResponse<WarmResult> {
    state.admin.warm(Some(&namespace)).await
}

// == Metrics ==
/// Handler for GET /cache/metrics/hit-ratio
pub async fn hit_ratio_handler(State(state): State<AppState>) -> AdminResponse<HitRatio> {
    state.admin.hit_ratio().await
}

/// Handler for GET /cache/metrics/memory-usage
pub async fn memory_usage_handler(State(state): State<AppState>) -> AdminResponse<MemoryAnalysis> {
    state.admin.memory_analysis().await
}

/// Handler for GET /cache/health
pub async fn cache_health_handler(State(state): State<AppState>) -> AdminResponse<HealthSnapshot> {
    state.admin.health().await
}

/// Handler for GET /cache/info
pub async fn info_handler(State(state): State<AppState>) -> AdminResponse<CacheInfo> {
    state.admin.info().await
}

// == Invalidation ==
/// Handler for POST /cache/invalidate
///
/// Entry point for write-path services reporting a changed entity.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    payload: Result<Json<InvalidateRequest>, JsonRejection>,
) -> AdminResponse<InvalidationReport> {
    match payload {
        Ok(Json(req)) => state.admin.invalidate(&req).await,
        Err(rejection) => AdminResponse::invalid(rejection.body_text()),
    }
}
