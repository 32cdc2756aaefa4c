//! Upstream fetch collaborator

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

/// Request parameters, ordered by key
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performs the real upstream call on a cache miss.
///
/// Errors are handed back to the caller of
/// [`ResponseCache::lookup_or_fetch`](crate::ResponseCache::lookup_or_fetch)
/// inside [`CacheError::Upstream`](crate::CacheError::Upstream); the cache
/// never retries or swallows them.
pub trait Upstream: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch(
        &self,
        endpoint: &str,
        method: Method,
        params: &Params,
    ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send;
}
