//! Polling ringer watcher running on its own thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::device::{AudioDevice, DeviceSnapshot};

/// Events sent from the watcher to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Ringer mode or media volume differs from the previous sample
    Changed {
        previous: DeviceSnapshot,
        current: DeviceSnapshot,
    },
}

/// Errors that can occur starting the watcher
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("ringer watcher is already running")]
    AlreadyRunning,

    #[error("failed to spawn watcher thread: {0}")]
    ThreadSpawn(String),
}

/// Samples the device at a fixed interval and forwards changes
pub struct RingerWatcher {
    device: Arc<dyn AudioDevice>,
    event_tx: mpsc::Sender<DeviceEvent>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl RingerWatcher {
    pub fn new(
        device: Arc<dyn AudioDevice>,
        event_tx: mpsc::Sender<DeviceEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            device,
            event_tx,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start watching.
    ///
    /// Spawns a dedicated thread that runs until `stop()` is called or the
    /// receiving side of the channel is dropped.
    pub fn start(&self) -> Result<(), WatcherError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WatcherError::AlreadyRunning);
        }

        let device = Arc::clone(&self.device);
        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        // Baseline taken before returning so changes made right after start() are seen
        let baseline = DeviceSnapshot::capture(self.device.as_ref());

        let spawned = thread::Builder::new()
            .name("ringer-watcher".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "ringer watcher thread started");
                poll_loop(device.as_ref(), baseline, &event_tx, &running, interval);
                running.store(false, Ordering::SeqCst);
                info!("ringer watcher thread stopped");
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(WatcherError::ThreadSpawn(e.to_string()));
        }

        Ok(())
    }

    /// Stop watching; the thread exits after its current sleep
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn poll_loop(
    device: &dyn AudioDevice,
    mut last: DeviceSnapshot,
    event_tx: &mpsc::Sender<DeviceEvent>,
    running: &AtomicBool,
    interval: Duration,
) {
    while running.load(Ordering::SeqCst) {
        thread::sleep(interval);

        let current = DeviceSnapshot::capture(device);
        if current == last {
            continue;
        }

        debug!(?last, ?current, "device audio state changed");

        // Not in an async context, so block until the daemon takes it
        let event = DeviceEvent::Changed {
            previous: last,
            current,
        };
        if event_tx.blocking_send(event).is_err() {
            warn!("failed to send device event - channel closed?");
            break;
        }

        last = current;
    }
}
