use std::{env, time::Duration};

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of values in the process-wide memory tier (default: 10,000)
    pub memory_capacity: usize,
    /// TTL applied by the object stores, in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Path to SQLite database file (default: "tiercache.db")
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Only used when the `redis` feature is enabled.
    pub redis_url: String,
    /// Log every published model at debug level (default: false)
    pub log_print: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `TIERCACHE_MEMORY_CAPACITY` - Memory tier capacity (default: 10,000)
    /// - `TIERCACHE_CACHE_TTL_SECONDS` - Object store TTL in seconds (default: 300)
    /// - `TIERCACHE_SQLITE_PATH` - SQLite database path (default: "tiercache.db")
    /// - `TIERCACHE_REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `TIERCACHE_LOG_PRINT` - `true`/`1` enables model logging (default: false)
    pub fn from_env() -> Self {
        Self {
            memory_capacity: env::var("TIERCACHE_MEMORY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            cache_ttl_seconds: env::var("TIERCACHE_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            sqlite_path: env::var("TIERCACHE_SQLITE_PATH")
                .unwrap_or_else(|_| "tiercache.db".to_string()),
            redis_url: env::var("TIERCACHE_REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            log_print: env::var("TIERCACHE_LOG_PRINT")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Get object store TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_ttl_conversion() {
        let config = Config {
            memory_capacity: 10_000,
            cache_ttl_seconds: 600,
            sqlite_path: "test.db".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            log_print: false,
        };

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        env::remove_var("TIERCACHE_MEMORY_CAPACITY");
        env::remove_var("TIERCACHE_CACHE_TTL_SECONDS");
        env::remove_var("TIERCACHE_SQLITE_PATH");
        env::remove_var("TIERCACHE_REDIS_URL");
        env::remove_var("TIERCACHE_LOG_PRINT");

        let config = Config::from_env();

        assert_eq!(config.memory_capacity, 10_000);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.sqlite_path, "tiercache.db");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert!(!config.log_print);
    }
}
