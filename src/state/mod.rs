//! Mode controller module
//!
//! Provides the controller that cycles the device between sound modes:
//! - current mode detection from live device state
//! - next eligible mode selection under user exclusions
//! - transitions with media volume snapshot/restore
//! - persisted bookkeeping across restarts

mod controller;
mod display;
mod snapshot;

pub use controller::{ControllerError, ModeController, ToggleOutcome};
pub use display::{TileState, TileStatus};
pub use snapshot::{ControllerState, ModeSnapshot};
