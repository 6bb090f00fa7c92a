//! Persistence of the alert cooldown map
//!
//! The daemon is the only writer. A missing or unreadable file is treated as
//! "no prior state" so a damaged record cannot wedge alerting; the price is a
//! possible duplicate notification after corruption.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use super::atomic::write_json_atomic;
use super::error::{StorageError, StorageResult};
use crate::monitors::AlertState;

const STATE_FILE: &str = "alert_state.json";

#[derive(Debug, Clone)]
pub struct AlertStateStore {
    path: PathBuf,
}

impl AlertStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file inside a state directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, falling back to an empty state when it is missing or corrupt.
    pub fn load(&self) -> AlertState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                trace!("no alert state at {}, starting empty", self.path.display());
                AlertState::default()
            }
            Err(e) => {
                warn!("ignoring unreadable alert state: {e}");
                AlertState::default()
            }
        }
    }

    /// Load the state, reporting a missing file as `None` and corruption as an error.
    pub fn try_load(&self) -> StorageResult<Option<AlertState>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::corrupt(&self.path, e))
    }

    /// Write the state atomically. Persisting the same state twice yields identical bytes.
    pub fn persist(&self, state: &AlertState) -> StorageResult<()> {
        write_json_atomic(&self.path, state)?;
        trace!("persisted alert state ({} keys)", state.last_fired.len());
        Ok(())
    }
}
