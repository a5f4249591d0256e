//! Sound mode registry
//!
//! A fixed, ordered catalog of modes. Registry order defines the cycle:
//! - Normal: ringer on
//! - Vibrate: vibrate ringer, media audible
//! - VibrateHush: vibrate ringer, media muted (restores media volume on exit)
//! - Silent: no sound, no vibration

mod registry;

pub use registry::{detect, next_eligible, Mode, ParseModeError, MODES, MODE_COUNT};
