//! Sound mode cycling for a quick-settings style toggle
//!
//! The [`state::ModeController`] cycles a device through the modes of
//! [`modes::MODES`], skipping user exclusions and restoring media volume
//! when leaving a mode that muted it. The daemon binary wires it to a
//! device watcher and a local IPC socket.

pub mod config;
pub mod device;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod modes;
pub mod settings;
pub mod state;
pub mod store;
pub mod watcher;
