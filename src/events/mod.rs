//! Events module for mode transitions and display updates
//!
//! Every step of a transition is published as a structured event so that
//! the tile front end and log consumers see the same sequence.

use serde::{Deserialize, Serialize};

use crate::modes::Mode;
use crate::state::TileState;

/// Events emitted by the mode controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// Media volume restored on leaving a volume-restoring mode
    VolumeRestored { mode: Mode, volume: u32 },

    /// Restore skipped because the user changed the device since the last transition
    RestoreSkipped {
        mode: Mode,
        /// Volume found on the device, kept as-is
        live_volume: u32,
    },

    /// Media volume captured on entering a volume-restoring mode
    SnapshotTaken { mode: Mode, volume: u32 },

    /// The device refused part of a mode activation
    ActivationRejected { mode: Mode, reason: String },

    /// A transition completed
    ModeChanged { from: Option<Mode>, to: Mode },

    /// Toggle requested but every mode is excluded
    NoEligibleMode,

    /// The tile should show this state
    TileUpdated(TileState),
}

impl std::fmt::Display for StateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateEvent::VolumeRestored { mode, volume } => {
                write!(f, "VOLUME_RESTORED ({mode} -> {volume})")
            }
            StateEvent::RestoreSkipped { mode, live_volume } => {
                write!(f, "RESTORE_SKIPPED ({mode}, kept {live_volume})")
            }
            StateEvent::SnapshotTaken { mode, volume } => {
                write!(f, "SNAPSHOT_TAKEN ({mode} = {volume})")
            }
            StateEvent::ActivationRejected { mode, reason } => {
                write!(f, "ACTIVATION_REJECTED ({mode}: {reason})")
            }
            StateEvent::ModeChanged { from: Some(from), to } => {
                write!(f, "MODE_CHANGED ({from} -> {to})")
            }
            StateEvent::ModeChanged { from: None, to } => {
                write!(f, "MODE_CHANGED (Unknown -> {to})")
            }
            StateEvent::NoEligibleMode => write!(f, "NO_ELIGIBLE_MODE"),
            StateEvent::TileUpdated(tile) => write!(f, "TILE_UPDATED ({})", tile.label),
        }
    }
}
