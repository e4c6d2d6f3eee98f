//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `GET /health` - Service liveness
//! - `GET /cache/stats`, `GET /cache/stats/detailed` - Key and store statistics
//! - `DELETE /cache/clear` - Clear every key under the prefix
//! - `DELETE /cache/namespaces/:namespace` - Clear one namespace
//! - `DELETE /cache/clear/search`, `/cache/clear/analytics` - Clear namespace groups
//! - `DELETE /cache/clear/expired` - Remove keys stored without expiry
//! - `POST /cache/warm`, `POST /cache/warm/:namespace` - Run warmers
//! - `GET /cache/metrics/hit-ratio`, `/cache/metrics/memory-usage` - Telemetry
//! - `GET /cache/health` - Composite cache health
//! - `GET /cache/info` - TTL table and invalidation rules
//! - `POST /cache/invalidate` - Entity-changed notification

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
