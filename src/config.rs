//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "SOUND_TOGGLE_DATA_DIR";
/// Watcher poll interval in milliseconds
pub const POLL_MS_ENV: &str = "SOUND_TOGGLE_POLL_MS";
/// Max media volume of the simulated device
pub const MAX_VOLUME_ENV: &str = "SOUND_TOGGLE_MAX_VOLUME";

const DEFAULT_POLL_MS: u64 = 250;
const DEFAULT_MAX_VOLUME: u32 = 15;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Persisted controller state
    pub state_path: PathBuf,

    /// User settings (mode exclusions)
    pub settings_path: PathBuf,

    /// How often the watcher samples the device
    pub poll_interval: Duration,

    pub max_volume: u32,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("sound-toggle")
            }
        };

        let poll_ms = match lookup(POLL_MS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid {POLL_MS_ENV}: {raw:?}"))?,
            None => DEFAULT_POLL_MS,
        };
        anyhow::ensure!(poll_ms > 0, "{POLL_MS_ENV} must be positive");

        let max_volume = match lookup(MAX_VOLUME_ENV) {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid {MAX_VOLUME_ENV}: {raw:?}"))?,
            None => DEFAULT_MAX_VOLUME,
        };
        // Vibrate parks the volume at half of max, which must stay above zero
        anyhow::ensure!(max_volume >= 2, "{MAX_VOLUME_ENV} must be at least 2");

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            state_path: data_dir.join("state.json"),
            settings_path: data_dir.join("settings.json"),
            data_dir,
            poll_interval: Duration::from_millis(poll_ms),
            max_volume,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
