use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Caching policy of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Network only; nothing is read from or written to a cache.
    NoCache,
    /// Read the persistent tier, then refresh from the network when online.
    DatabaseCache,
    /// Read the memory tier, falling back to the persistent tier, then refresh
    /// from the network when online.
    MemoryCache,
    /// Network when online, persistent tier only when offline.
    DatabaseCacheNoNetwork,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::NoCache,
        Strategy::DatabaseCache,
        Strategy::MemoryCache,
        Strategy::DatabaseCacheNoNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NoCache => "no-cache",
            Strategy::DatabaseCache => "database-cache",
            Strategy::MemoryCache => "memory-cache",
            Strategy::DatabaseCacheNoNetwork => "database-cache-no-network",
        }
    }

    /// Whether this strategy keeps anything in a cache tier.
    pub fn uses_cache(&self) -> bool {
        !matches!(self, Strategy::NoCache)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown strategy: {0}")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

/// Where a value being intercepted was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Cache,
    Network,
}
