//! Store Info Module
//!
//! Counters and server facts reported by a backing store.

use serde::Serialize;

// == Store Info ==
/// Snapshot of the backing store's own counters.
///
/// Hit and miss counts come from the store, not from this process, so
/// several cache engines sharing one store see the same numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreInfo {
    /// Bytes currently used
    pub used_memory: u64,
    /// Configured ceiling in bytes, 0 = unbounded
    pub max_memory: u64,
    /// Successful key lookups
    pub hits: u64,
    /// Failed key lookups
    pub misses: u64,
    /// Connected clients
    pub connected_clients: u64,
    /// Server version string
    pub version: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
}

impl StoreInfo {
    /// Total lookups seen by the store.
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Parses the text returned by the Redis `INFO` command.
    pub fn from_redis_info(raw: &str) -> Self {
        let mut info = StoreInfo::default();
        for line in raw.lines() {
            let Some((field, value)) = line.trim().split_once(':') else {
                continue;
            };
            let number = || value.trim().parse::<u64>().unwrap_or(0);
            match field {
                "used_memory" => info.used_memory = number(),
                "maxmemory" => info.max_memory = number(),
                "keyspace_hits" => info.hits = number(),
                "keyspace_misses" => info.misses = number(),
                "connected_clients" => info.connected_clients = number(),
                "redis_version" => info.version = value.trim().to_string(),
                "uptime_in_seconds" => info.uptime_seconds = number(),
                _ => {}
            }
        }
        info
    }
}

/// Formats a byte count the way Redis renders `used_memory_human`.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "K", "M", "G"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{}B", bytes)
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(StoreInfo::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let info = StoreInfo {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(info.hit_rate(), 0.75);
        assert_eq!(info.total_requests(), 4);
    }

    #[test]
    fn test_parse_redis_info() {
        let raw = "# Server\r\nredis_version:7.2.4\r\nuptime_in_seconds:3600\r\n\
                   # Clients\r\nconnected_clients:3\r\n\
                   # Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\nmaxmemory:0\r\n\
                   # Stats\r\nkeyspace_hits:80\r\nkeyspace_misses:20\r\n";
        let info = StoreInfo::from_redis_info(raw);
        assert_eq!(info.version, "7.2.4");
        assert_eq!(info.uptime_seconds, 3600);
        assert_eq!(info.connected_clients, 3);
        assert_eq!(info.used_memory, 1_048_576);
        assert_eq!(info.max_memory, 0);
        assert_eq!(info.hits, 80);
        assert_eq!(info.misses, 20);
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512B");
        assert_eq!(human_bytes(1536), "1.50K");
        assert_eq!(human_bytes(1_048_576), "1.00M");
    }
}
