//! What the quick-settings tile shows for a detected mode

use serde::{Deserialize, Serialize};

use crate::modes::Mode;

/// Label shown when the device matches no registered mode
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
    Active,
    Unavailable,
}

/// Display update handed to the tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileState {
    pub label: String,
    pub icon: Option<String>,
    pub state: TileStatus,
}

impl TileState {
    pub fn for_mode(mode: Option<Mode>) -> Self {
        match mode {
            Some(mode) => Self {
                label: mode.name().to_string(),
                icon: Some(mode.icon().to_string()),
                state: TileStatus::Active,
            },
            None => Self {
                label: UNKNOWN_LABEL.to_string(),
                icon: None,
                state: TileStatus::Unavailable,
            },
        }
    }
}
