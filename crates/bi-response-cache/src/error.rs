//! Error types for the response cache

use bi_format::DecodeError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CacheError {
    Io(Box<io::Error>),
    /// The endpoint log is corrupt; it stays unusable until repaired
    Decode {
        path: PathBuf,
        source: DecodeError,
    },
    /// The upstream collaborator failed; carried unchanged
    Upstream(Box<dyn std::error::Error + Send + Sync>),
    InvalidEndpoint(String),
    /// A blocking log task panicked or was cancelled
    Task(String),
}

impl CacheError {
    /// Attach the log path to a reader fault, keeping I/O failures as I/O.
    pub fn from_decode(path: PathBuf, err: DecodeError) -> Self {
        match err {
            DecodeError::Io(err) => CacheError::Io(err),
            source => CacheError::Decode { path, source },
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, CacheError::Upstream(_))
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "IO error: {}", err),
            CacheError::Decode { path, source } => {
                write!(f, "Corrupt cache log {}: {}", path.display(), source)
            }
            CacheError::Upstream(err) => write!(f, "Upstream fetch failed: {}", err),
            CacheError::InvalidEndpoint(name) => write!(f, "Invalid endpoint name: {:?}", name),
            CacheError::Task(msg) => write!(f, "Cache task failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err.as_ref()),
            CacheError::Decode { source, .. } => Some(source),
            CacheError::Upstream(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        CacheError::Io(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        CacheError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
