//! Device change watcher
//!
//! Stands in for the platform's ringer-mode-changed broadcast: a dedicated
//! thread samples the device and reports every change, whoever caused it.

mod dispatch;
mod poller;

pub use dispatch::refresh_on_device_events;
pub use poller::{DeviceEvent, RingerWatcher, WatcherError};
