//! Mapping from endpoint names to log files

use crate::error::{CacheError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub const LOG_EXTENSION: &str = "bi";

/// Resolves an endpoint to the log file that caches it.
///
/// The returned path must be stable for the life of the process and its
/// parent directory must exist.
pub trait LogStore: Send + Sync {
    fn log_path(&self, endpoint: &str) -> Result<PathBuf>;
}

/// Stores every endpoint log as `<root>/<endpoint>.bi`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the root directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        info!(root = ?self.root, "Log store initialized");
        Ok(())
    }
}

impl LogStore for DirectoryStore {
    fn log_path(&self, endpoint: &str) -> Result<PathBuf> {
        validate_endpoint(endpoint)?;
        Ok(self.root.join(format!("{}.{}", endpoint, LOG_EXTENSION)))
    }
}

/// Endpoint names become file names, so they must stay inside the root.
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let bad = endpoint.is_empty()
        || endpoint == "."
        || endpoint == ".."
        || endpoint.contains(['/', '\\', '\0']);
    if bad {
        return Err(CacheError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}
