//! Persistence for snapshots and alert state
//!
//! ## Design
//!
//! - **Trait-based**: `SnapshotStore` allows swapping the JSON file store for
//!   the in-memory store in tests and one-shot runs
//! - **Atomic**: every file is replaced via write-to-temp-then-rename, so a
//!   concurrently running reader never sees a torn record
//! - **Plain JSON**: records stay readable by external tooling
//!
//! ## Usage
//!
//! ```no_run
//! use stack_monitor::storage::{JsonFileStore, SnapshotStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = JsonFileStore::open("./monitoring")?;
//!     if let Some(snapshot) = store.latest()? {
//!         println!("last sample at {}", snapshot.timestamp);
//!     }
//!     Ok(())
//! }
//! ```

pub mod atomic;
pub mod backend;
pub mod error;
pub mod json;
pub mod memory;
pub mod state;

pub use backend::{History, SnapshotStore, StoreStats, load_history};
pub use error::{StorageError, StorageResult};
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use state::AlertStateStore;
