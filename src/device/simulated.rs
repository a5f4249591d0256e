//! In-memory device used by the daemon on hosts without a phone audio stack,
//! and by the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::{AudioDevice, DeviceError, RingerMode, Stream};

#[derive(Debug)]
struct Inner {
    ringer: RingerMode,
    volumes: HashMap<Stream, u32>,
}

/// Simulated audio device with per-stream volumes
#[derive(Debug)]
pub struct SimulatedDevice {
    inner: Mutex<Inner>,
    max_volume: u32,
    policy_access: AtomicBool,
    /// When set, every mutation is refused as if blocked by OS policy
    deny_mutations: AtomicBool,
    vibrations: AtomicU32,
}

impl SimulatedDevice {
    /// Create a device in Normal ringer mode with every stream at half volume
    pub fn new(max_volume: u32) -> Self {
        let volumes = [Stream::Music, Stream::Ring]
            .into_iter()
            .map(|stream| (stream, max_volume / 2))
            .collect();

        Self {
            inner: Mutex::new(Inner {
                ringer: RingerMode::Normal,
                volumes,
            }),
            max_volume,
            policy_access: AtomicBool::new(true),
            deny_mutations: AtomicBool::new(false),
            vibrations: AtomicU32::new(0),
        }
    }

    pub fn set_policy_access(&self, granted: bool) {
        self.policy_access.store(granted, Ordering::SeqCst);
    }

    pub fn set_deny_mutations(&self, deny: bool) {
        self.deny_mutations.store(deny, Ordering::SeqCst);
    }

    /// Number of haptic pulses fired so far
    pub fn vibration_count(&self) -> u32 {
        self.vibrations.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-update of plain values
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_policy(&self, what: impl Into<String>) -> Result<(), DeviceError> {
        if self.deny_mutations.load(Ordering::SeqCst) {
            Err(DeviceError::PolicyRejected(what.into()))
        } else {
            Ok(())
        }
    }
}

impl AudioDevice for SimulatedDevice {
    fn ringer_mode(&self) -> RingerMode {
        self.lock().ringer
    }

    fn stream_volume(&self, stream: Stream) -> u32 {
        self.lock().volumes.get(&stream).copied().unwrap_or(0)
    }

    fn max_stream_volume(&self, _stream: Stream) -> u32 {
        self.max_volume
    }

    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), DeviceError> {
        self.check_policy(format!("ringer change to {mode}"))?;
        debug!(%mode, "simulated ringer mode set");
        self.lock().ringer = mode;
        Ok(())
    }

    fn set_stream_volume(&self, stream: Stream, volume: u32) -> Result<(), DeviceError> {
        if volume > self.max_volume {
            return Err(DeviceError::VolumeOutOfRange {
                stream,
                volume,
                max: self.max_volume,
            });
        }
        self.check_policy(format!("{stream:?} volume change"))?;
        debug!(?stream, volume, "simulated stream volume set");
        self.lock().volumes.insert(stream, volume);
        Ok(())
    }

    fn vibrate(&self, duration: Duration) {
        debug!(duration_ms = duration.as_millis() as u64, "simulated vibration");
        self.vibrations.fetch_add(1, Ordering::SeqCst);
    }

    fn is_policy_access_granted(&self) -> bool {
        self.policy_access.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let device = SimulatedDevice::new(15);
        assert_eq!(device.ringer_mode(), RingerMode::Normal);
        assert_eq!(device.stream_volume(Stream::Music), 7);
        assert_eq!(device.max_stream_volume(Stream::Music), 15);
        assert!(device.is_policy_access_granted());
    }

    #[test]
    fn test_volume_out_of_range() {
        let device = SimulatedDevice::new(10);
        let err = device.set_stream_volume(Stream::Music, 11).unwrap_err();
        assert!(matches!(err, DeviceError::VolumeOutOfRange { max: 10, .. }));
        assert_eq!(device.stream_volume(Stream::Music), 5);
    }

    #[test]
    fn test_denied_mutations_leave_state() {
        let device = SimulatedDevice::new(10);
        device.set_deny_mutations(true);

        assert!(device.set_ringer_mode(RingerMode::Silent).is_err());
        assert!(device.set_stream_volume(Stream::Music, 0).is_err());
        assert_eq!(device.ringer_mode(), RingerMode::Normal);
        assert_eq!(device.stream_volume(Stream::Music), 5);
    }

    #[test]
    fn test_vibration_counter() {
        let device = SimulatedDevice::new(10);
        device.vibrate(Duration::from_millis(500));
        device.vibrate(Duration::from_millis(500));
        assert_eq!(device.vibration_count(), 2);
    }
}
