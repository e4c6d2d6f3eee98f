//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_health_handler, clear_all_handler, clear_analytics_handler, clear_expired_handler,
    clear_namespace_handler, clear_search_handler, detailed_stats_handler, health_handler,
    hit_ratio_handler, info_handler, invalidate_handler, memory_usage_handler, stats_handler,
    warm_all_handler, warm_namespace_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/stats/detailed", get(detailed_stats_handler))
        .route("/cache/clear", delete(clear_all_handler))
        .route("/cache/namespaces/:namespace", delete(clear_namespace_handler))
        .route("/cache/clear/search", delete(clear_search_handler))
        .route("/cache/clear/analytics", delete(clear_analytics_handler))
        .route("/cache/clear/expired", delete(clear_expired_handler))
        .route("/cache/warm", post(warm_all_handler))
        .route("/cache/warm/:namespace", post(warm_namespace_handler))
        .route("/cache/metrics/hit-ratio", get(hit_ratio_handler))
        .route("/cache/metrics/memory-usage", get(memory_usage_handler))
        .route("/cache/health", get(cache_health_handler))
        .route("/cache/info", get(info_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
