//! User settings: the set of modes excluded from cycling
//!
//! The controller only ever reads exclusions. Writing them belongs to the
//! settings surface (the `set_exclusions` IPC request).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::modes::{Mode, ParseModeError};
use crate::store::write_atomic;

/// Names of modes the user opted out of cycling through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Build a set from user input, rejecting names no mode carries
    pub fn from_mode_names<I, S>(names: I) -> Result<Self, ParseModeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().parse::<Mode>().map(|mode| mode.name()))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Errors reading or writing the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Format(#[from] serde_json::Error),
}

/// On-disk settings document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub excluded_modes: ExclusionSet,
}

impl Settings {
    /// Load settings, treating a missing file as defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        Ok(serde_json::from_str(&json)?)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(?e, "ignoring unreadable settings");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes()).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_from_mode_names_rejects_unknown() {
        let set = ExclusionSet::from_mode_names(["Vibrate", "Silent"]).unwrap();
        assert!(set.contains("Vibrate"));
        assert!(set.contains("Silent"));
        assert!(!set.contains("Normal"));

        let err = ExclusionSet::from_mode_names(["Vibrate", "Loud"]).unwrap_err();
        assert_eq!(err.0, "Loud");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert!(settings.excluded_modes.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings {
            excluded_modes: ["Vibrate"].into_iter().collect(),
        };
        settings.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("excluded_modes"));
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_readers_never_see_partial_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            excluded_modes: ["Vibrate", "VibrateHush"].into_iter().collect(),
        };
        settings.save(&path).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let path = path.clone();
            let settings = settings.clone();
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    settings.save(&path).unwrap();
                }
            })
        };

        let torn = (0..5_000)
            .filter(|_| Settings::load_or_default(&path) != settings)
            .count();

        stop.store(true, Ordering::SeqCst);
        writer.join().unwrap();
        assert_eq!(torn, 0, "reads saw a document other than the one being saved");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(SettingsError::Format(_))));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
    }
}
