//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror. Strategies never surface
//! these to callers; they are consumed by the cache, invalidation and admin
//! layers and reach HTTP clients only as an `AdminResponse` envelope.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing store not initialized or refusing connections
    #[error("Cache backend unavailable")]
    Unavailable,

    /// A backing store call exceeded the configured timeout
    #[error("Cache operation timed out: {0}")]
    Timeout(String),

    /// Error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Namespace name that is not part of the registry
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// Entity kind that has no invalidation rule
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

impl CacheError {
    /// Returns true when the error means "no cache right now" rather than a
    /// fault in a specific operation.
    pub fn is_unavailable(&self) -> bool {
        match self {
            CacheError::Unavailable | CacheError::Timeout(_) => true,
            CacheError::Redis(e) => e.is_connection_refusal() || e.is_timeout() || e.is_io_error(),
            _ => false,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(CacheError::Unavailable.is_unavailable());
        assert!(CacheError::Timeout("get".to_string()).is_unavailable());
        assert!(!CacheError::UnknownNamespace("x".to_string()).is_unavailable());
    }

    #[test]
    fn test_redis_errors() {
        let refused = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(CacheError::from(refused).is_unavailable());

        let bad_reply = redis::RedisError::from((redis::ErrorKind::TypeError, "bad reply"));
        let err = CacheError::from(bad_reply);
        assert!(!err.is_unavailable());
        assert!(err.to_string().starts_with("Redis error:"));
    }
}
