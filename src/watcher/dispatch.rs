//! Feeds watcher reports into the controller

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::state::ModeController;

use super::DeviceEvent;

/// Refresh the tile for every device change until the watcher hangs up.
///
/// Changes made outside the controller only update the display. They never
/// transition, snapshot or touch the stored state.
pub async fn refresh_on_device_events(
    mut device_rx: mpsc::Receiver<DeviceEvent>,
    controller: Arc<Mutex<ModeController>>,
) {
    while let Some(DeviceEvent::Changed { previous, current }) = device_rx.recv().await {
        debug!(?previous, ?current, "device change received");
        controller.lock().await.refresh_display();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AudioDevice, DeviceSnapshot, RingerMode, SimulatedDevice};
    use crate::events::StateEvent;
    use crate::modes::Mode;
    use crate::state::TileState;
    use crate::store::MemoryStore;
    use tokio::sync::broadcast;

    #[tokio::test]
    async fn test_device_change_updates_tile_without_saving() {
        let device = Arc::new(SimulatedDevice::new(15));
        let store = MemoryStore::new();
        let (event_tx, mut events) = broadcast::channel(16);
        let controller = Arc::new(Mutex::new(ModeController::load(
            device.clone(),
            Box::new(store.clone()),
            event_tx,
        )));

        let previous = DeviceSnapshot::capture(device.as_ref());
        device.set_ringer_mode(RingerMode::Silent).unwrap();
        let current = DeviceSnapshot::capture(device.as_ref());

        let (device_tx, device_rx) = mpsc::channel(4);
        device_tx
            .send(DeviceEvent::Changed { previous, current })
            .await
            .unwrap();
        drop(device_tx);

        refresh_on_device_events(device_rx, controller).await;

        assert_eq!(
            events.try_recv().unwrap(),
            StateEvent::TileUpdated(TileState::for_mode(Some(Mode::Silent)))
        );
        assert!(events.try_recv().is_err());
        assert!(store.saved().is_none());
    }
}
