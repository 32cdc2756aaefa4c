//! Log placement for market scripts

use bi_response_cache::{DirectoryStore, LogStore, Result};
use std::path::PathBuf;

/// Stores one log per script, ignoring a trailing `.php` so `Search.php` and
/// `Search` share `Search.bi`.
#[derive(Debug, Clone)]
pub struct ScriptStore {
    inner: DirectoryStore,
}

impl ScriptStore {
    pub fn new(inner: DirectoryStore) -> Self {
        Self { inner }
    }
}

impl LogStore for ScriptStore {
    fn log_path(&self, endpoint: &str) -> Result<PathBuf> {
        let title = endpoint.strip_suffix(".php").unwrap_or(endpoint);
        self.inner.log_path(title)
    }
}
