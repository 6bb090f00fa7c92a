//! In-memory snapshot store (no persistence)
//!
//! Useful for tests and for one-shot runs that must not touch the state
//! directory. All data is lost when the process exits.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::backend::{History, SnapshotStore, StoreStats};
use super::error::StorageResult;
use crate::MetricsSnapshot;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    history: BTreeMap<DateTime<Utc>, MetricsSnapshot>,
    latest: Option<MetricsSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn append(&self, snapshot: &MetricsSnapshot) -> StorageResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.history.insert(snapshot.timestamp, snapshot.clone());
        inner.latest = Some(snapshot.clone());
        Ok(())
    }

    fn latest(&self) -> StorageResult<Option<MetricsSnapshot>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.latest.clone())
    }

    fn history(&self, max_count: usize) -> StorageResult<History<'_>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let snapshots: Vec<_> = inner
            .history
            .values()
            .rev()
            .take(max_count)
            .cloned()
            .collect();
        Ok(Box::new(snapshots.into_iter().map(Ok)))
    }

    fn prune(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let kept = inner.history.split_off(&before);
        let deleted = inner.history.len();
        inner.history = kept;
        debug!("pruned {deleted} in-memory snapshots");
        Ok(deleted)
    }

    fn stats(&self) -> StorageResult<StoreStats> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(StoreStats {
            history_count: inner.history.len(),
            oldest: inner.history.keys().next().copied(),
            newest: inner.history.keys().next_back().copied(),
        })
    }
}
