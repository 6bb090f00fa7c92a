//! JSON file snapshot store
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   latest.json                                  most recent snapshot
//!   history/snapshot-20261015T120000.000000Z.json   one file per cycle
//! ```
//!
//! History files are named by snapshot timestamp, so listing the directory
//! is enough to order, bound and prune the series. Every file is written
//! through [`write_atomic`].

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, instrument, trace};

use super::atomic::{write_atomic, write_json_atomic};
use super::backend::{History, SnapshotStore, StoreStats};
use super::error::{StorageError, StorageResult};
use crate::MetricsSnapshot;

const LATEST_FILE: &str = "latest.json";

const HISTORY_DIR: &str = "history";

const SNAPSHOT_PREFIX: &str = "snapshot-";

const SNAPSHOT_SUFFIX: &str = ".json";

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";

const TIMESTAMP_PARSE_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (and create) a store rooted at `root`.
    ///
    /// Fails with [`StorageError::Unwritable`] when the directory cannot be
    /// created or written, which is the only fatal storage condition.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let history_dir = root.join(HISTORY_DIR);

        fs::create_dir_all(&history_dir).map_err(|e| {
            StorageError::Unwritable(format!("cannot create {}: {e}", history_dir.display()))
        })?;

        let probe = root.join(".write-check");
        write_atomic(&probe, b"ok").map_err(|e| {
            StorageError::Unwritable(format!("cannot write to {}: {e}", root.display()))
        })?;
        let _ = fs::remove_file(&probe);

        debug!("opened snapshot store at {}", root.display());
        Ok(Self { root })
    }

    /// Open an existing store for reading without creating or writing anything.
    ///
    /// A root without a `history/` directory reads as an empty history.
    pub fn open_read_only(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        if !fs::metadata(&root)?.is_dir() {
            return Err(StorageError::IoError(io::Error::other(format!(
                "{} is not a directory",
                root.display()
            ))));
        }

        debug!("opened snapshot store at {} (read-only)", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn latest_path(&self) -> PathBuf {
        self.root.join(LATEST_FILE)
    }

    fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    fn history_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.history_dir().join(snapshot_file_name(timestamp))
    }

    /// All history files with their timestamps, newest first.
    fn list_history(&self) -> StorageResult<Vec<(DateTime<Utc>, PathBuf)>> {
        let mut entries = Vec::new();

        let dir = match fs::read_dir(self.history_dir()) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        for entry in dir {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            match parse_snapshot_file_name(name) {
                Some(timestamp) => entries.push((timestamp, path)),
                None => trace!("ignoring foreign file {}", path.display()),
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries)
    }
}

impl SnapshotStore for JsonFileStore {
    #[instrument(skip_all, fields(timestamp = %snapshot.timestamp))]
    fn append(&self, snapshot: &MetricsSnapshot) -> StorageResult<()> {
        write_json_atomic(&self.history_path(snapshot.timestamp), snapshot)?;
        write_json_atomic(&self.latest_path(), snapshot)?;
        trace!("appended snapshot");
        Ok(())
    }

    fn latest(&self) -> StorageResult<Option<MetricsSnapshot>> {
        let path = self.latest_path();
        if !path.exists() {
            return Ok(None);
        }
        read_snapshot(&path).map(Some)
    }

    fn history(&self, max_count: usize) -> StorageResult<History<'_>> {
        let entries = self.list_history()?;
        Ok(Box::new(
            entries
                .into_iter()
                .take(max_count)
                .map(|(_, path)| read_snapshot(&path)),
        ))
    }

    #[instrument(skip(self))]
    fn prune(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let mut deleted = 0;

        for (timestamp, path) in self.list_history()? {
            if timestamp < before {
                fs::remove_file(&path)?;
                deleted += 1;
            }
        }

        if deleted > 0 {
            info!("pruned {deleted} snapshots older than {before}");
        }
        Ok(deleted)
    }

    fn stats(&self) -> StorageResult<StoreStats> {
        let entries = self.list_history()?;
        Ok(StoreStats {
            history_count: entries.len(),
            oldest: entries.last().map(|(timestamp, _)| *timestamp),
            newest: entries.first().map(|(timestamp, _)| *timestamp),
        })
    }
}

fn read_snapshot(path: &Path) -> StorageResult<MetricsSnapshot> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| StorageError::corrupt(path, e))
}

pub fn snapshot_file_name(timestamp: DateTime<Utc>) -> String {
    format!(
        "{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}",
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

pub fn parse_snapshot_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_PARSE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
