//! Controller bookkeeping and its validated conversion from the stored document

use tracing::warn;

use crate::modes::{Mode, MODES, MODE_COUNT};
use crate::store::{PersistedSnapshot, PersistedState, ABSENT};

/// Media volume captured when a volume-restoring mode was entered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeSnapshot {
    /// `None` until a snapshot has been taken
    pub media_volume: Option<u32>,
}

/// Everything the controller remembers between transitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    /// Mode the controller itself last entered
    pub last_mode: Option<Mode>,
    /// Media volume right after that transition
    pub last_observed_volume: Option<u32>,
    snapshots: [ModeSnapshot; MODE_COUNT],
}

impl ControllerState {
    pub fn snapshot(&self, mode: Mode) -> ModeSnapshot {
        self.snapshots[mode.index()]
    }

    pub fn set_snapshot(&mut self, mode: Mode, media_volume: u32) {
        self.snapshots[mode.index()] = ModeSnapshot {
            media_volume: Some(media_volume),
        };
    }

    /// Rebuild state from a stored document.
    ///
    /// Unknown mode names and volumes outside `[0, max_volume]` are dropped
    /// rather than rejected, so a damaged document degrades to "nothing to
    /// restore" instead of failing startup. A document written by a newer
    /// format version is ignored entirely.
    pub fn from_persisted(doc: &PersistedState, max_volume: u32) -> Self {
        if doc.version > PersistedState::VERSION {
            warn!(
                version = doc.version,
                supported = PersistedState::VERSION,
                "ignoring state document from a newer format"
            );
            return Self::default();
        }
        if doc.version < PersistedState::VERSION {
            warn!(version = doc.version, "reading state document from an older format");
        }

        let last_mode = doc.last_mode.as_deref().and_then(|name| match name.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!(%e, "dropping stored last mode");
                None
            }
        });
        let mut state = Self {
            last_mode,
            last_observed_volume: volume_in_range(doc.last_observed_volume, max_volume),
            ..Self::default()
        };

        for (name, snapshot) in &doc.snapshots {
            let Ok(mode) = name.parse::<Mode>() else {
                warn!(name = %name, "dropping snapshot for unknown mode");
                continue;
            };
            state.snapshots[mode.index()] = ModeSnapshot {
                media_volume: volume_in_range(snapshot.media_volume, max_volume),
            };
        }

        state
    }

    pub fn to_persisted(&self) -> PersistedState {
        let snapshots = MODES
            .iter()
            .map(|mode| {
                let media_volume = self
                    .snapshot(*mode)
                    .media_volume
                    .map_or(ABSENT, i64::from);
                (mode.name().to_string(), PersistedSnapshot { media_volume })
            })
            .collect();

        PersistedState {
            version: PersistedState::VERSION,
            last_mode: self.last_mode.map(|mode| mode.name().to_string()),
            last_observed_volume: self.last_observed_volume.map_or(ABSENT, i64::from),
            snapshots,
        }
    }
}

fn volume_in_range(raw: i64, max_volume: u32) -> Option<u32> {
    if raw == ABSENT {
        return None;
    }
    match u32::try_from(raw) {
        Ok(volume) if volume <= max_volume => Some(volume),
        _ => {
            warn!(raw, max_volume, "dropping out-of-range stored volume");
            None
        }
    }
}
