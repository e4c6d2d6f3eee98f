//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::backend::RedisBackendConfig;
use crate::cache::{Environment, PolicyRegistry};
use crate::tasks::Schedule;

/// URL scheme selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment, selects the TTL tier
    pub environment: Environment,
    /// Backing store URL; `memory://` selects the in-process store
    pub redis_url: String,
    /// Prefix of every cache key
    pub cache_prefix: String,
    /// HTTP server port
    pub server_port: u16,
    /// Connect and per-operation timeout in seconds
    pub cache_timeout: u64,
    /// Refresh loop interval in seconds
    pub refresh_interval: u64,
    /// Health monitor interval in seconds
    pub health_interval: u64,
    /// Cleanup loop interval in seconds
    pub cleanup_interval: u64,
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Loop interval in seconds; zero would spin the loop, so it falls back too.
fn interval(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

fn default_prefix(environment: Environment) -> String {
    format!("delivery-{}", environment)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `ENVIRONMENT` - development | staging | production (default: development)
    /// - `REDIS_URL` - Backing store URL (default: redis://localhost:6379)
    /// - `CACHE_PREFIX` - Key prefix (default: delivery-{environment})
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `CACHE_TIMEOUT_SECS` - Store timeout in seconds (default: 5)
    /// - `REFRESH_INTERVAL_SECS` - Refresh loop interval (default: 1800)
    /// - `HEALTH_INTERVAL_SECS` - Health monitor interval (default: 300)
    /// - `CLEANUP_INTERVAL_SECS` - Cleanup loop interval (default: 7200)
    ///
    /// Interval values of 0 are ignored in favour of the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT")
            .map(|name| Environment::from_name(&name))
            .unwrap_or(defaults.environment);

        Self {
            environment,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_prefix: env::var("CACHE_PREFIX")
                .ok()
                .filter(|prefix| !prefix.trim().is_empty())
                .unwrap_or_else(|| default_prefix(environment)),
            server_port: parsed("SERVER_PORT", defaults.server_port),
            cache_timeout: parsed("CACHE_TIMEOUT_SECS", defaults.cache_timeout),
            refresh_interval: interval("REFRESH_INTERVAL_SECS", defaults.refresh_interval),
            health_interval: interval("HEALTH_INTERVAL_SECS", defaults.health_interval),
            cleanup_interval: interval("CLEANUP_INTERVAL_SECS", defaults.cleanup_interval),
        }
    }

    pub fn uses_memory_backend(&self) -> bool {
        self.redis_url.starts_with(MEMORY_URL)
    }

    pub fn policy(&self) -> PolicyRegistry {
        PolicyRegistry::new(self.environment, self.cache_prefix.clone())
    }

    pub fn redis(&self) -> RedisBackendConfig {
        RedisBackendConfig {
            url: self.redis_url.clone(),
            timeout: Duration::from_secs(self.cache_timeout),
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            refresh: Duration::from_secs(self.refresh_interval),
            health: Duration::from_secs(self.health_interval),
            cleanup: Duration::from_secs(self.cleanup_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            redis_url: "redis://localhost:6379".to_string(),
            cache_prefix: default_prefix(environment),
            server_port: 8000,
            cache_timeout: 5,
            refresh_interval: 1800,
            health_interval: 300,
            cleanup_interval: 7200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.cache_prefix, "delivery-development");
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.cache_timeout, 5);
        assert!(!config.uses_memory_backend());
        assert_eq!(config.schedule(), Schedule::default());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the process environment to avoid races
        for name in [
            "ENVIRONMENT",
            "REDIS_URL",
            "CACHE_PREFIX",
            "SERVER_PORT",
            "CACHE_TIMEOUT_SECS",
            "REFRESH_INTERVAL_SECS",
            "HEALTH_INTERVAL_SECS",
            "CLEANUP_INTERVAL_SECS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.refresh_interval, 1800);
        assert_eq!(config.cleanup_interval, 7200);

        env::set_var("ENVIRONMENT", "production");
        env::set_var("REDIS_URL", "memory://");
        env::set_var("SERVER_PORT", "not-a-port");
        env::set_var("HEALTH_INTERVAL_SECS", "60");
        env::set_var("REFRESH_INTERVAL_SECS", "0");
        env::set_var("CLEANUP_INTERVAL_SECS", "-5");

        let config = Config::from_env();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.cache_prefix, "delivery-production");
        assert!(config.uses_memory_backend());
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.schedule().health, Duration::from_secs(60));
        assert_eq!(config.refresh_interval, 1800);
        assert_eq!(config.cleanup_interval, 7200);
        assert_eq!(config.policy().ttl_for_name("restaurant-detail"), 2400);

        for name in [
            "ENVIRONMENT",
            "REDIS_URL",
            "SERVER_PORT",
            "HEALTH_INTERVAL_SECS",
            "REFRESH_INTERVAL_SECS",
            "CLEANUP_INTERVAL_SECS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_redis_config() {
        let config = Config {
            cache_timeout: 2,
            ..Config::default()
        };
        let redis = config.redis();
        assert_eq!(redis.url, "redis://localhost:6379");
        assert_eq!(redis.timeout, Duration::from_secs(2));
    }
}
