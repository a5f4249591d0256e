//! JSON file store with atomic replacement

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::{PersistedState, StateStore, StoreError};

/// Stores the state document as pretty JSON.
///
/// Saves go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let state: PersistedState = serde_json::from_str(&json)?;
        debug!(path = ?self.path, version = state.version, "state document loaded");
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| self.io_error(e))?;

        debug!(path = ?self.path, "state document saved");
        Ok(())
    }
}

/// Replace `path` with `contents` in one step.
///
/// Each call writes its own sibling temp file and renames it over the target,
/// so readers see either the old or the new document, never a truncated one,
/// even with several writers racing.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        NEXT_TEMP.fetch_add(1, Ordering::Relaxed)
    ));
    let temp = path.with_file_name(name);

    if let Err(e) = std::fs::write(&temp, contents).and_then(|()| std::fs::rename(&temp, path)) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}
