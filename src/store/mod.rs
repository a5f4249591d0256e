//! Durable controller state
//!
//! The controller writes its whole state as one document after every
//! transition, so snapshots and last-mode bookkeeping always change together.

mod file;
#[cfg(test)]
mod memory;

pub(crate) use file::write_atomic;
pub use file::JsonFileStore;
#[cfg(test)]
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sentinel written for "no value recorded"
pub const ABSENT: i64 = -1;

/// Persisted snapshot for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    #[serde(default = "absent")]
    pub media_volume: i64,
}

/// On-disk representation of the controller state.
///
/// Modes are keyed by name. Nothing here is validated; see
/// `ControllerState::from_persisted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub last_mode: Option<String>,
    #[serde(default = "absent")]
    pub last_observed_volume: i64,
    #[serde(default)]
    pub snapshots: BTreeMap<String, PersistedSnapshot>,
}

impl PersistedState {
    /// Current document format version
    pub const VERSION: u32 = 1;
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: Self::VERSION,
            last_mode: None,
            last_observed_volume: ABSENT,
            snapshots: BTreeMap::new(),
        }
    }
}

fn absent() -> i64 {
    ABSENT
}

fn current_version() -> u32 {
    PersistedState::VERSION
}

/// Errors from a state store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed state document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value style durable storage for [`PersistedState`]
pub trait StateStore: Send {
    /// Read the last saved state, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<PersistedState>, StoreError>;

    /// Replace the saved state in one write
    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError>;
}
