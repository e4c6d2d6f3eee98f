//! Response DTOs for the admin API
//!
//! Every administrative operation answers with an [`AdminResponse`] envelope
//! carrying a status, an optional message and payload, and a timestamp.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::CacheError;

// == Admin Envelope ==
/// Outcome class of an administrative operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    Success,
    CacheUnavailable,
    Error,
}

/// Envelope returned by every administrative operation.
#[derive(Debug, Clone, Serialize)]
pub struct AdminResponse<T> {
    pub status: AdminStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// ISO 8601
    pub timestamp: String,
    /// Error caused by the request rather than the cache
    #[serde(skip)]
    invalid_input: bool,
}

impl<T> AdminResponse<T> {
    fn build(status: AdminStatus, message: Option<String>, data: Option<T>) -> Self {
        Self {
            status,
            message,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            invalid_input: false,
        }
    }

    pub fn success(data: T) -> Self {
        Self::build(AdminStatus::Success, None, Some(data))
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self::build(AdminStatus::Success, Some(message.into()), Some(data))
    }

    pub fn unavailable() -> Self {
        Self::build(
            AdminStatus::CacheUnavailable,
            Some("Cache backend is not available".to_string()),
            None,
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::build(AdminStatus::Error, Some(message.into()), None)
    }

    /// Error status for a malformed request.
    pub fn invalid(message: impl Into<String>) -> Self {
        let mut response = Self::error(message);
        response.invalid_input = true;
        response
    }

    /// Unavailability becomes `cache_unavailable`; anything else `error`.
    pub fn from_error(err: &CacheError) -> Self {
        match err {
            CacheError::UnknownNamespace(_) | CacheError::UnknownEntity(_) => {
                Self::invalid(err.to_string())
            }
            e if e.is_unavailable() => Self::unavailable(),
            e => Self::error(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AdminStatus::Success
    }

    /// HTTP status the envelope is served with.
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            AdminStatus::Success => StatusCode::OK,
            AdminStatus::CacheUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AdminStatus::Error if self.invalid_input => StatusCode::BAD_REQUEST,
            AdminStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl<T: Serialize> IntoResponse for AdminResponse<T> {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}

// == Payloads ==
/// Payload of the stats operation.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub total_keys: usize,
    pub memory_usage: String,
    pub connected_clients: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_ratio_percent: f64,
    pub keys_by_namespace: BTreeMap<String, usize>,
}

/// Per-namespace section of the detailed stats.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NamespaceDetail {
    pub key_count: usize,
    /// Configured TTL in seconds
    pub ttl_seconds: u64,
    pub memory_estimate_bytes: u64,
    /// Remaining TTL per expiring key
    pub ttl_remaining: BTreeMap<String, u64>,
}

/// Payload of the detailed stats operation.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedStats {
    pub overview: CacheStats,
    pub memory_estimate_bytes: u64,
    pub version: String,
    pub namespaces: BTreeMap<String, NamespaceDetail>,
}

/// Payload of clear operations.
#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared_keys: u64,
    pub namespaces: Vec<String>,
}

/// Payload of warm operations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WarmResult {
    /// Entries written per warmer
    pub warmed: BTreeMap<String, usize>,
    pub failures: Vec<String>,
}

/// Payload of the info operation.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub environment: String,
    pub prefix: String,
    pub backend: Option<&'static str>,
    pub available: bool,
    pub default_ttl: u64,
    pub ttl_seconds: BTreeMap<String, u64>,
    pub invalidation_rules: BTreeMap<&'static str, Vec<String>>,
}

/// Response body for the liveness endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Whether a backing store is attached
    pub cache_available: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(cache_available: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            cache_available,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let resp = AdminResponse::success(3u64);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], 3);
        assert!(json.get("message").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_unavailable_envelope() {
        let resp: AdminResponse<()> = AdminResponse::from_error(&CacheError::Unavailable);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "cache_unavailable");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let resp: AdminResponse<()> =
            AdminResponse::from_error(&CacheError::UnknownNamespace("nope".to_string()));
        assert_eq!(resp.status, AdminStatus::Error);
        assert!(resp.message.unwrap().contains("nope"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(AdminResponse::success(1u8).http_status(), StatusCode::OK);
        assert_eq!(
            AdminResponse::<()>::unavailable().http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AdminResponse::<()>::invalid("bad").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AdminResponse::<()>::from_error(&CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "bad reply",
            ))))
            .http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let json = serde_json::to_value(AdminResponse::<()>::invalid("bad")).unwrap();
        assert!(json.get("invalid_input").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("\"cache_available\":false"));
    }
}
