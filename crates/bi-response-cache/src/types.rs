//! Cache types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Policy for a [`crate::ResponseCache`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Oldest entry that may still be served
    pub max_age: Duration,
    /// Hold one lock per log file for the whole lookup, fetch and append
    pub serialize_endpoints: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 60 * 60),
            serialize_endpoints: true,
        }
    }
}

/// Response body and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: Vec<u8>,
    pub hit: bool,
}

/// Statistics about the cache since startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Matching entries passed over because they were too old
    pub stale_skips: u64,
}

/// Outcome of rewriting one log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub kept: usize,
    pub dropped: usize,
}
