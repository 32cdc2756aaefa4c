//! Upstream response cache backed by bi logs
//!
//! Each endpoint owns one append-only log holding `timestamp` integer fields
//! followed by blob fields keyed by request signature. A lookup scans the log
//! for the first blob with a matching signature whose governing timestamp is
//! within the decay window; otherwise the upstream is called and a new
//! timestamp/blob pair is appended. Nothing is ever rewritten in place except
//! by an explicit [`ResponseCache::compact`].

mod cache;
mod error;
mod signature;
mod store;
mod types;
mod upstream;

pub use cache::{scan_log, ResponseCache, Scan, TIMESTAMP_FIELD};
pub use error::{CacheError, Result};
pub use signature::Signature;
pub use store::{DirectoryStore, LogStore, LOG_EXTENSION};
pub use types::{CacheConfig, CacheStats, CachedResponse, CompactionReport};
pub use upstream::{Method, Params, Upstream};
