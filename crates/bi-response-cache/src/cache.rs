//! Lookup-or-fetch over append-only endpoint logs

use crate::error::{CacheError, Result};
use crate::signature::Signature;
use crate::store::LogStore;
use crate::types::{CacheConfig, CacheStats, CachedResponse, CompactionReport};
use crate::upstream::{Method, Params, Upstream};
use bi_format::{BlobField, Field, IntegerField, LogReader, LogWriter};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

/// Name of the integer field that dates the blobs following it
pub const TIMESTAMP_FIELD: &[u8] = b"timestamp";

/// Result of scanning one log for a signature
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Scan {
    /// Content of the first fresh matching blob
    pub hit: Option<Vec<u8>>,
    /// Matching blobs passed over as too old before the hit (or end)
    pub stale: u64,
}

/// Scan a log for the first blob named `signature` that is at most
/// `max_age` seconds old at `now`.
///
/// A blob's age is measured from the most recent `timestamp` field before
/// it; blobs before any timestamp count as written at `now`. Decoding stops
/// at the first fresh match.
pub fn scan_log<R: Read>(
    source: R,
    signature: &[u8],
    now: i64,
    max_age: i64,
) -> bi_format::Result<Scan> {
    let mut reader = LogReader::new(source);
    let mut current_timestamp = now;
    let mut stale = 0;

    for field in reader.fields() {
        match field? {
            Field::Integer(field) if field.name == TIMESTAMP_FIELD => {
                current_timestamp = field.value;
            }
            Field::Blob(field) if field.name == signature => {
                let age = now.saturating_sub(current_timestamp);
                if age <= max_age {
                    return Ok(Scan {
                        hit: Some(field.content),
                        stale,
                    });
                }
                stale += 1;
            }
            _ => {}
        }
    }

    Ok(Scan { hit: None, stale })
}

/// Response cache over one log file per endpoint
pub struct ResponseCache<S> {
    store: S,
    config: CacheConfig,
    /// One lock per resolved log path
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_skips: AtomicU64,
}

impl<S: LogStore> ResponseCache<S> {
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_skips: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_skips: self.stale_skips.load(Ordering::Relaxed),
        }
    }

    fn max_age_secs(&self) -> i64 {
        i64::try_from(self.config.max_age.as_secs()).unwrap_or(i64::MAX)
    }

    /// Take the lock for `path`, dropping map entries nobody holds or waits on.
    async fn lock_log(&self, path: &Path) -> Option<OwnedMutexGuard<()>> {
        if !self.config.serialize_endpoints {
            return None;
        }
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        Some(lock.lock_owned().await)
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Serve `params` for `endpoint` from its log, or fetch and append.
    pub async fn lookup_or_fetch<U: Upstream>(
        &self,
        upstream: &U,
        endpoint: &str,
        method: Method,
        params: &Params,
    ) -> Result<CachedResponse> {
        self.lookup_or_fetch_at(Utc::now(), upstream, endpoint, method, params)
            .await
    }

    /// [`lookup_or_fetch`](Self::lookup_or_fetch) with an explicit clock
    pub async fn lookup_or_fetch_at<U: Upstream>(
        &self,
        now: DateTime<Utc>,
        upstream: &U,
        endpoint: &str,
        method: Method,
        params: &Params,
    ) -> Result<CachedResponse> {
        let path = self.store.log_path(endpoint)?;
        let signature = Signature::from_params(params);
        let now = now.timestamp();

        let guard = self.lock_log(&path).await;
        ensure_log_exists(&path).await?;

        let scan = scan_file(path.clone(), signature.clone(), now, self.max_age_secs()).await?;
        if scan.stale > 0 {
            self.stale_skips.fetch_add(scan.stale, Ordering::Relaxed);
            debug!(endpoint, signature = %signature, stale = scan.stale, "Skipped stale entries");
        }
        if let Some(body) = scan.hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(endpoint, signature = %signature, size = body.len(), "Cache hit");
            return Ok(CachedResponse { body, hit: true });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(endpoint, signature = %signature, %method, "Cache miss, fetching upstream");

        let body = upstream
            .fetch(endpoint, method, params)
            .await
            .map_err(|e| CacheError::Upstream(Box::new(e)))?;

        let body = append_entry(path, signature.clone(), now, body, guard).await?;
        info!(endpoint, signature = %signature, size = body.len(), "Cached upstream response");

        Ok(CachedResponse { body, hit: false })
    }

    /// Rewrite an endpoint log keeping only fresh entries.
    pub async fn compact(&self, endpoint: &str) -> Result<CompactionReport> {
        self.compact_at(Utc::now(), endpoint).await
    }

    /// Rewrite an endpoint log as of `now`.
    ///
    /// For each signature only the first fresh blob is kept, since that is
    /// the one a lookup serves, preceded by the timestamp that dated it.
    /// Blobs that had no timestamp before them stay undated at the head of
    /// the log. Stale blobs and any other fields are dropped. The new log
    /// replaces the old one atomically.
    pub async fn compact_at(&self, now: DateTime<Utc>, endpoint: &str) -> Result<CompactionReport> {
        let path = self.store.log_path(endpoint)?;
        let now = now.timestamp();
        let max_age = self.max_age_secs();

        let _guard = self.lock_log(&path).await;
        ensure_log_exists(&path).await?;

        let report =
            tokio::task::spawn_blocking(move || compact_file(&path, now, max_age)).await??;
        info!(endpoint, kept = report.kept, dropped = report.dropped, "Compacted cache log");
        Ok(report)
    }
}

/// Create the log empty if it does not exist yet
async fn ensure_log_exists(path: &Path) -> Result<()> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(())
}

async fn scan_file(path: PathBuf, signature: Signature, now: i64, max_age: i64) -> Result<Scan> {
    tokio::task::spawn_blocking(move || {
        let file = File::open(&path)?;
        scan_log(BufReader::new(file), signature.as_bytes(), now, max_age).map_err(|err| {
            error!(path = ?path, error = %err, "Failed to decode cache log");
            CacheError::from_decode(path, err)
        })
    })
    .await?
}

/// Append one timestamp and blob pair and hand the body back.
///
/// The write runs to completion on the blocking pool even if the caller is
/// dropped, and the endpoint lock is released only once it has finished.
async fn append_entry(
    path: PathBuf,
    signature: Signature,
    now: i64,
    body: Vec<u8>,
    guard: Option<OwnedMutexGuard<()>>,
) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let _guard = guard;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = LogWriter::new(file);
        writer.append_all(&[
            Field::from(IntegerField::new(TIMESTAMP_FIELD, now)),
            Field::from(BlobField::new(signature.as_bytes(), body.as_slice())),
        ])?;
        writer.flush()?;
        Ok(body)
    })
    .await?
}

fn compact_file(path: &Path, now: i64, max_age: i64) -> Result<CompactionReport> {
    let file = File::open(path)?;
    let mut reader = LogReader::new(BufReader::new(file));
    let mut current_timestamp = None;
    let mut entries: Vec<(Option<i64>, BlobField)> = Vec::new();
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut total = 0;

    for field in reader.fields() {
        let field = field.map_err(|err| CacheError::from_decode(path.to_path_buf(), err))?;
        match field {
            Field::Integer(field) if field.name == TIMESTAMP_FIELD => {
                current_timestamp = Some(field.value);
            }
            Field::Blob(blob) => {
                total += 1;
                let written = current_timestamp.unwrap_or(now);
                if now.saturating_sub(written) > max_age || seen.contains(&blob.name) {
                    continue;
                }
                seen.insert(blob.name.clone());
                entries.push((current_timestamp, blob));
            }
            Field::Integer(_) => {}
        }
    }

    let kept = entries.len();
    let tmp_path = path.with_extension("bi.compact");
    if let Err(err) = write_compacted(&tmp_path, entries) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    std::fs::rename(&tmp_path, path)?;

    Ok(CompactionReport {
        kept,
        dropped: total - kept,
    })
}

/// Write kept entries to `tmp_path` and sync it.
///
/// Undated entries can only come first, so they are never governed by a
/// later timestamp.
fn write_compacted(tmp_path: &Path, entries: Vec<(Option<i64>, BlobField)>) -> io::Result<()> {
    let mut writer = LogWriter::new(BufWriter::new(File::create(tmp_path)?));
    for (timestamp, blob) in entries {
        match timestamp {
            Some(timestamp) => writer.append_all(&[
                Field::from(IntegerField::new(TIMESTAMP_FIELD, timestamp)),
                Field::from(blob),
            ])?,
            None => writer.append(&Field::from(blob))?,
        }
    }
    let file = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}
