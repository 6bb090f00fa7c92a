//! Snapshot store trait definition
//!
//! This module defines the `SnapshotStore` trait implemented by the JSON
//! file store and the in-memory store.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::error::StorageResult;
use crate::MetricsSnapshot;

/// Newest-first sequence of historical snapshots.
///
/// Records are decoded as the iterator advances; a record that cannot be
/// decoded is yielded as an error without ending the sequence.
pub type History<'a> = Box<dyn Iterator<Item = StorageResult<MetricsSnapshot>> + 'a>;

/// Statistics about the stored series
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of historical records
    pub history_count: usize,

    /// Timestamp of the oldest historical record
    pub oldest: Option<DateTime<Utc>>,

    /// Timestamp of the newest historical record
    pub newest: Option<DateTime<Utc>>,
}

/// Persistent storage for metric snapshots
///
/// The store keeps two things:
///
/// - a time-ordered historical series, one record per sampling cycle
/// - a single "latest" record, overwritten on every append
///
/// ## Concurrency
///
/// Exactly one writer (the daemon, or a one-shot check) appends at a time.
/// Readers in other processes must never observe a partially written
/// record, so file-backed implementations replace records atomically.
pub trait SnapshotStore: Send + Sync {
    /// Write the snapshot to the historical series and overwrite the latest record.
    fn append(&self, snapshot: &MetricsSnapshot) -> StorageResult<()>;

    /// The most recently appended snapshot, `None` if nothing was ever written.
    fn latest(&self) -> StorageResult<Option<MetricsSnapshot>>;

    /// Up to `max_count` historical snapshots, newest first.
    ///
    /// Every call re-reads the underlying storage.
    fn history(&self, max_count: usize) -> StorageResult<History<'_>>;

    /// Delete historical snapshots older than `before`. The latest record is kept.
    ///
    /// Returns the number of snapshots deleted.
    fn prune(&self, before: DateTime<Utc>) -> StorageResult<usize>;

    fn stats(&self) -> StorageResult<StoreStats>;
}

/// Collect `history(max_count)`, skipping records that cannot be decoded.
pub fn load_history(
    store: &dyn SnapshotStore,
    max_count: usize,
) -> StorageResult<Vec<MetricsSnapshot>> {
    let mut snapshots = Vec::new();
    for record in store.history(max_count)? {
        match record {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => warn!("skipping unreadable snapshot: {e}"),
        }
    }
    Ok(snapshots)
}
