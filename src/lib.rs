//! Delivery Cache - relationship-aware caching layer for a food delivery platform
//!
//! Provides namespaced TTL policy, read/write caching strategies, entity-driven
//! invalidation cascades, store telemetry and background maintenance.

pub mod admin;
pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod tasks;
pub mod telemetry;

pub use admin::CacheAdmin;
pub use api::AppState;
pub use cache::{CacheClient, CacheKey, Namespace, PolicyRegistry};
pub use config::Config;
pub use error::{CacheError, Result};
pub use invalidation::{EntityChange, Invalidator};
pub use tasks::MaintenanceScheduler;
pub use telemetry::Telemetry;
