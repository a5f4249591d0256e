//! sound-toggle-daemon: cycles the device ringer through named sound modes
//!
//! This daemon owns the mode controller and provides:
//! - Mode cycling (Normal, Vibrate, VibrateHush, Silent) with user exclusions
//! - Media volume snapshot/restore around volume-restoring modes
//! - A ringer watcher that keeps the tile in sync with manual changes
//! - IPC server for the tile front end

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sound_toggle::config::Config;
use sound_toggle::device::{AudioDevice, SimulatedDevice};
use sound_toggle::events::StateEvent;
use sound_toggle::ipc::{DaemonContext, Server};
use sound_toggle::lifecycle::ShutdownSignal;
use sound_toggle::state::ModeController;
use sound_toggle::store::JsonFileStore;
use sound_toggle::watcher::{refresh_on_device_events, DeviceEvent, RingerWatcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "sound-toggle-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.state_path, "configuration loaded");

    // Register signal handlers before anything long-running starts
    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    let device: Arc<dyn AudioDevice> = Arc::new(SimulatedDevice::new(config.max_volume));

    // Watcher -> daemon (device changes)
    let (device_tx, device_rx) = mpsc::channel::<DeviceEvent>(32);
    // Controller -> IPC subscribers (state events)
    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    // Create the controller from persisted state and show where we are
    let store = JsonFileStore::new(&config.state_path);
    let controller = ModeController::load(Arc::clone(&device), Box::new(store), event_tx.clone());
    let tile = controller.refresh_display();
    info!(label = %tile.label, "initial tile state");
    let controller = Arc::new(Mutex::new(controller));

    // Start the ringer watcher (runs on dedicated thread)
    let watcher = RingerWatcher::new(Arc::clone(&device), device_tx, config.poll_interval);
    watcher.start().context("failed to start ringer watcher")?;

    let server = Server::new(
        &config.socket_path,
        DaemonContext {
            controller: Arc::clone(&controller),
            device: Arc::clone(&device),
            settings_path: config.settings_path.clone(),
            event_tx: event_tx.clone(),
            start_time: Instant::now(),
        },
    )?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Device changes only refresh the tile, they never transition
        _ = refresh_on_device_events(device_rx, Arc::clone(&controller)) => {
            info!("ringer watcher channel closed");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        reason = shutdown.wait() => {
            info!(?reason, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    watcher.stop();
    server.shutdown().await;

    info!("sound-toggle-daemon stopped");

    Ok(())
}
