//! Mode definitions, detection and cyclic successor lookup

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{AudioDevice, DeviceError, DeviceSnapshot, RingerMode, Stream};
use crate::settings::ExclusionSet;

/// Length of the haptic pulse fired when entering an audible or vibrating mode
const HAPTIC_PULSE: Duration = Duration::from_millis(500);

/// Number of registered modes
pub const MODE_COUNT: usize = 4;

/// Every registered mode, in cycling order
pub const MODES: [Mode; MODE_COUNT] = [Mode::Normal, Mode::Vibrate, Mode::VibrateHush, Mode::Silent];

/// A named, detectable, activatable ringer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mode {
    Normal,
    Vibrate,
    /// Vibrate without media
    VibrateHush,
    Silent,
}

impl Mode {
    /// Unique name, also used as the key in exclusion sets
    pub fn name(self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Vibrate => "Vibrate",
            Mode::VibrateHush => "VibrateHush",
            Mode::Silent => "Silent",
        }
    }

    /// Opaque icon reference handed to the tile
    pub fn icon(self) -> &'static str {
        match self {
            Mode::Normal => "ic_audio_vol",
            Mode::Vibrate => "ic_audio_ring_notif_vibrate",
            Mode::VibrateHush => "vibratehush",
            Mode::Silent => "ic_audio_vol_mute",
        }
    }

    /// Position in [`MODES`]
    pub fn index(self) -> usize {
        match self {
            Mode::Normal => 0,
            Mode::Vibrate => 1,
            Mode::VibrateHush => 2,
            Mode::Silent => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        MODES.get(index).copied()
    }

    /// Whether media volume is snapshotted on entry and restored on exit
    pub fn restores_volume(self) -> bool {
        matches!(self, Mode::VibrateHush)
    }

    /// Is the device currently in this mode?
    pub fn detect(self, state: &DeviceSnapshot) -> bool {
        match self {
            Mode::Normal => state.ringer == RingerMode::Normal,
            Mode::Vibrate => state.ringer == RingerMode::Vibrate && state.media_volume > 0,
            Mode::VibrateHush => state.ringer == RingerMode::Vibrate && state.media_volume == 0,
            Mode::Silent => state.ringer == RingerMode::Silent,
        }
    }

    /// Mutate device state to enter this mode.
    ///
    /// Stops at the first change the device refuses.
    pub fn activate(self, device: &dyn AudioDevice) -> Result<(), DeviceError> {
        match self {
            Mode::Normal => {
                device.set_ringer_mode(RingerMode::Normal)?;
                device.vibrate(HAPTIC_PULSE);
            }
            Mode::Vibrate => {
                device.set_ringer_mode(RingerMode::Vibrate)?;
                let max = device.max_stream_volume(Stream::Music);
                device.set_stream_volume(Stream::Music, max / 2)?;
                device.vibrate(HAPTIC_PULSE);
            }
            Mode::VibrateHush => {
                device.set_ringer_mode(RingerMode::Vibrate)?;
                device.set_stream_volume(Stream::Music, 0)?;
                device.vibrate(HAPTIC_PULSE);
            }
            Mode::Silent => {
                device.set_ringer_mode(RingerMode::Silent)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sound mode: {0}")]
pub struct ParseModeError(pub String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODES
            .iter()
            .copied()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// First mode in registry order whose predicate matches, `None` when the
/// device is in a state no mode describes (e.g. do-not-disturb).
pub fn detect(device: &dyn AudioDevice) -> Option<Mode> {
    let state = DeviceSnapshot::capture(device);
    MODES.iter().copied().find(|mode| mode.detect(&state))
}

/// Next mode after `current` in cyclic order that is not excluded.
///
/// An unknown current mode counts as position -1, so the scan starts at
/// the first registered mode. Returns `None` only when every mode is excluded.
pub fn next_eligible(current: Option<Mode>, exclusions: &ExclusionSet) -> Option<Mode> {
    let len = MODES.len();
    // Offset by one so Unknown sits just before index 0
    let start = current.map_or(0, |mode| mode.index() + 1);

    (1..=len)
        .map(|step| MODES[(start + step - 1) % len])
        .find(|mode| !exclusions.contains(mode.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDevice;

    fn excluded(names: &[&str]) -> ExclusionSet {
        names.iter().copied().collect()
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for mode in MODES {
            assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
            assert_eq!(Mode::from_index(mode.index()), Some(mode));
        }
        assert!("Loud".parse::<Mode>().is_err());
        assert_eq!(Mode::from_index(MODES.len()), None);
    }

    #[test]
    fn test_only_vibrate_hush_restores_volume() {
        let restoring: Vec<Mode> = MODES.into_iter().filter(|m| m.restores_volume()).collect();
        assert_eq!(restoring, vec![Mode::VibrateHush]);
    }

    #[test]
    fn test_detect_each_mode() {
        let device = SimulatedDevice::new(15);
        assert_eq!(detect(&device), Some(Mode::Normal));

        device.set_ringer_mode(RingerMode::Vibrate).unwrap();
        assert_eq!(detect(&device), Some(Mode::Vibrate));

        device.set_stream_volume(Stream::Music, 0).unwrap();
        assert_eq!(detect(&device), Some(Mode::VibrateHush));

        device.set_ringer_mode(RingerMode::Silent).unwrap();
        assert_eq!(detect(&device), Some(Mode::Silent));
    }

    #[test]
    fn test_predicates_are_mutually_exclusive() {
        for ringer in [RingerMode::Normal, RingerMode::Vibrate, RingerMode::Silent] {
            for media_volume in [0, 1, 15] {
                let state = DeviceSnapshot { ringer, media_volume };
                let matches = MODES.iter().filter(|m| m.detect(&state)).count();
                assert_eq!(matches, 1, "{ringer} at volume {media_volume}");
            }
        }
    }

    #[test]
    fn test_activate_then_detect() {
        let device = SimulatedDevice::new(15);
        for mode in MODES {
            mode.activate(&device).unwrap();
            assert_eq!(detect(&device), Some(mode));
        }
    }

    #[test]
    fn test_vibrate_sets_half_media_volume() {
        let device = SimulatedDevice::new(15);
        device.set_stream_volume(Stream::Music, 0).unwrap();

        Mode::Vibrate.activate(&device).unwrap();
        assert_eq!(device.stream_volume(Stream::Music), 7);
    }

    #[test]
    fn test_silent_does_not_vibrate() {
        let device = SimulatedDevice::new(15);
        Mode::Silent.activate(&device).unwrap();
        assert_eq!(device.vibration_count(), 0);

        Mode::Normal.activate(&device).unwrap();
        assert_eq!(device.vibration_count(), 1);
    }

    #[test]
    fn test_activate_reports_rejection() {
        let device = SimulatedDevice::new(15);
        device.set_deny_mutations(true);
        assert!(matches!(
            Mode::Silent.activate(&device),
            Err(DeviceError::PolicyRejected(_))
        ));
    }

    #[test]
    fn test_next_without_exclusions_is_successor() {
        let none = ExclusionSet::default();
        for mode in MODES {
            let expected = MODES[(mode.index() + 1) % MODES.len()];
            assert_eq!(next_eligible(Some(mode), &none), Some(expected));
        }
    }

    #[test]
    fn test_next_from_unknown_starts_at_first_mode() {
        assert_eq!(next_eligible(None, &ExclusionSet::default()), Some(Mode::Normal));
        assert_eq!(next_eligible(None, &excluded(&["Normal"])), Some(Mode::Vibrate));
    }

    #[test]
    fn test_next_skips_excluded() {
        let exclusions = excluded(&["Vibrate"]);
        assert_eq!(next_eligible(Some(Mode::Silent), &exclusions), Some(Mode::Normal));
        assert_eq!(next_eligible(Some(Mode::Normal), &exclusions), Some(Mode::VibrateHush));
    }

    #[test]
    fn test_next_never_returns_excluded_mode() {
        // Every subset of modes that leaves at least one eligible
        for mask in 0u8..(1 << MODES.len()) - 1 {
            let exclusions: ExclusionSet = MODES
                .iter()
                .filter(|m| mask & (1 << m.index()) != 0)
                .map(|m| m.name())
                .collect();

            for current in MODES.iter().copied().map(Some).chain([None]) {
                let next = next_eligible(current, &exclusions).unwrap();
                assert!(!exclusions.contains(next.name()));
            }
        }
    }

    #[test]
    fn test_sole_eligible_mode_is_reselected() {
        let exclusions = excluded(&["Normal", "Vibrate", "Silent"]);
        assert_eq!(
            next_eligible(Some(Mode::VibrateHush), &exclusions),
            Some(Mode::VibrateHush)
        );
    }

    #[test]
    fn test_all_excluded_yields_none() {
        let exclusions = excluded(&["Normal", "Vibrate", "VibrateHush", "Silent"]);
        for current in MODES.iter().copied().map(Some).chain([None]) {
            assert_eq!(next_eligible(current, &exclusions), None);
        }
    }

    #[test]
    fn test_unknown_names_in_exclusions_are_ignored() {
        let exclusions = excluded(&["DoNotDisturb"]);
        assert_eq!(next_eligible(Some(Mode::Normal), &exclusions), Some(Mode::Vibrate));
    }
}
