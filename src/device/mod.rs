//! Device audio state provider
//!
//! The controller never talks to a concrete platform API. Everything it
//! needs from the device (ringer mode, stream volumes, haptics, policy
//! access) goes through the [`AudioDevice`] trait.

mod simulated;

pub use simulated::SimulatedDevice;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ringer mode reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingerMode {
    /// Ringer and notifications are audible
    Normal,
    /// Ringer replaced by vibration
    Vibrate,
    /// No sound, no vibration
    Silent,
}

impl Default for RingerMode {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for RingerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingerMode::Normal => write!(f, "normal"),
            RingerMode::Vibrate => write!(f, "vibrate"),
            RingerMode::Silent => write!(f, "silent"),
        }
    }
}

/// Audio streams whose volume can be queried or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    /// Media playback
    Music,
    /// Incoming call ringer
    Ring,
}

/// A device refused to apply a state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device policy rejected {0}")]
    PolicyRejected(String),

    #[error("volume {volume} out of range for {stream:?} (max {max})")]
    VolumeOutOfRange { stream: Stream, volume: u32, max: u32 },
}

/// Injected capability over the device's live audio state.
///
/// Implementations must tolerate being mutated by other parties between
/// calls; the controller never assumes it owns this state.
pub trait AudioDevice: Send + Sync {
    fn ringer_mode(&self) -> RingerMode;

    fn stream_volume(&self, stream: Stream) -> u32;

    fn max_stream_volume(&self, stream: Stream) -> u32;

    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), DeviceError>;

    fn set_stream_volume(&self, stream: Stream, volume: u32) -> Result<(), DeviceError>;

    /// One-shot haptic feedback. Best effort, devices without a vibrator ignore it.
    fn vibrate(&self, duration: Duration);

    /// Whether the app may change ringer/do-not-disturb related state
    fn is_policy_access_granted(&self) -> bool {
        true
    }
}

/// Ringer mode and media volume observed at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub ringer: RingerMode,
    pub media_volume: u32,
}

impl DeviceSnapshot {
    /// Read the parts of device state that mode detection depends on
    pub fn capture(device: &dyn AudioDevice) -> Self {
        Self {
            ringer: device.ringer_mode(),
            media_volume: device.stream_volume(Stream::Music),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ringer_serialization() {
        let json = serde_json::to_string(&RingerMode::Vibrate).unwrap();
        assert_eq!(json, "\"vibrate\"");

        let parsed: RingerMode = serde_json::from_str("\"silent\"").unwrap();
        assert_eq!(parsed, RingerMode::Silent);
    }

    #[test]
    fn test_snapshot_capture() {
        let device = SimulatedDevice::new(15);
        device.set_ringer_mode(RingerMode::Vibrate).unwrap();
        device.set_stream_volume(Stream::Music, 4).unwrap();

        let snapshot = DeviceSnapshot::capture(&device);
        assert_eq!(snapshot.ringer, RingerMode::Vibrate);
        assert_eq!(snapshot.media_volume, 4);
    }
}
