//! Mode controller
//!
//! Owns the per-mode volume snapshots and the last-transition bookkeeping,
//! and performs transitions between modes:
//! 1. leaving a volume-restoring mode restores its snapshot, unless the
//!    device changed since the controller entered it (manual interference)
//! 2. entering a volume-restoring mode snapshots the live media volume
//! 3. the target mode is activated
//! 4. the new bookkeeping is persisted in one write

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::device::{AudioDevice, Stream};
use crate::events::StateEvent;
use crate::modes::{self, Mode};
use crate::settings::ExclusionSet;
use crate::store::{StateStore, StoreError};

use super::display::TileState;
use super::snapshot::ControllerState;

/// Errors surfaced by the controller.
///
/// Device refusals are not errors here; they are logged and the controller
/// records the state it intended.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("failed to persist controller state: {0}")]
    Store(#[from] StoreError),
}

/// Result of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Moved from the detected mode (`None` when unknown) to the next eligible one
    Switched { from: Option<Mode>, to: Mode },
    /// Every mode is excluded; nothing changed
    NoEligibleMode,
}

/// Cycles the device through registered modes
pub struct ModeController {
    device: Arc<dyn AudioDevice>,
    store: Box<dyn StateStore>,
    state: ControllerState,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
}

impl ModeController {
    /// Create a controller, restoring whatever state the store holds.
    ///
    /// A missing or unreadable document starts from empty state.
    pub fn load(
        device: Arc<dyn AudioDevice>,
        store: Box<dyn StateStore>,
        event_tx: broadcast::Sender<StateEvent>,
    ) -> Self {
        let max_volume = device.max_stream_volume(Stream::Music);
        let state = match store.load() {
            Ok(Some(doc)) => ControllerState::from_persisted(&doc, max_volume),
            Ok(None) => {
                info!("no stored controller state, starting fresh");
                ControllerState::default()
            }
            Err(e) => {
                warn!(?e, "failed to load controller state, starting fresh");
                ControllerState::default()
            }
        };

        debug!(last_mode = ?state.last_mode, last_volume = ?state.last_observed_volume, "controller loaded");

        Self {
            device,
            store,
            state,
            event_tx,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Mode the device is in right now, `None` if unknown
    pub fn current_mode(&self) -> Option<Mode> {
        modes::detect(self.device.as_ref())
    }

    /// Next mode to cycle to, `None` when every mode is excluded
    pub fn next_eligible_mode(&self, current: Option<Mode>, exclusions: &ExclusionSet) -> Option<Mode> {
        modes::next_eligible(current, exclusions)
    }

    /// Move from the detected mode to the next non-excluded one
    pub fn toggle(&mut self, exclusions: &ExclusionSet) -> Result<ToggleOutcome, ControllerError> {
        let current = self.current_mode();

        let Some(next) = self.next_eligible_mode(current, exclusions) else {
            warn!("every mode is excluded, toggle ignored");
            self.emit(StateEvent::NoEligibleMode);
            return Ok(ToggleOutcome::NoEligibleMode);
        };

        let result = self.transition(current, next);
        self.refresh_display();
        result?;

        Ok(ToggleOutcome::Switched {
            from: current,
            to: next,
        })
    }

    /// Perform a transition.
    ///
    /// The device and in-memory state are updated even when persisting fails;
    /// the error only means the next session may see stale snapshots.
    pub fn transition(&mut self, from: Option<Mode>, to: Mode) -> Result<(), ControllerError> {
        if let Some(from) = from.filter(|mode| mode.restores_volume()) {
            self.restore_volume(from);
        }

        if to.restores_volume() {
            let volume = self.device.stream_volume(Stream::Music);
            self.state.set_snapshot(to, volume);
            debug!(mode = %to, volume, "media volume snapshot taken");
            self.emit(StateEvent::SnapshotTaken { mode: to, volume });
        }

        if let Err(e) = to.activate(self.device.as_ref()) {
            warn!(mode = %to, %e, "device rejected mode activation, recording intended state");
            self.emit(StateEvent::ActivationRejected {
                mode: to,
                reason: e.to_string(),
            });
        }

        let observed = self.device.stream_volume(Stream::Music);
        self.state.last_mode = Some(to);
        self.state.last_observed_volume = Some(observed);

        info!(
            from = %from.map_or("Unknown", Mode::name),
            to = %to,
            media_volume = observed,
            "mode transition"
        );
        self.emit(StateEvent::ModeChanged { from, to });

        self.store.save(&self.state.to_persisted())?;
        Ok(())
    }

    /// Recompute the current mode and publish it to the tile. Display only.
    pub fn refresh_display(&self) -> TileState {
        let tile = TileState::for_mode(self.current_mode());
        debug!(label = %tile.label, state = ?tile.state, "tile refreshed");
        self.emit(StateEvent::TileUpdated(tile.clone()));
        tile
    }

    /// Step 1 of a transition out of a volume-restoring mode
    fn restore_volume(&mut self, from: Mode) {
        let live = self.device.stream_volume(Stream::Music);

        if self.is_manual_change(from, live) {
            info!(
                mode = %from,
                live_volume = live,
                last_mode = ?self.state.last_mode,
                last_volume = ?self.state.last_observed_volume,
                "device changed outside the controller, keeping current volume"
            );
            self.emit(StateEvent::RestoreSkipped {
                mode: from,
                live_volume: live,
            });
            return;
        }

        let Some(saved) = self.state.snapshot(from).media_volume else {
            debug!(mode = %from, "no snapshot to restore");
            return;
        };

        let volume = saved.min(self.device.max_stream_volume(Stream::Music));
        match self.device.set_stream_volume(Stream::Music, volume) {
            Ok(()) => {
                debug!(mode = %from, volume, "media volume restored");
                self.emit(StateEvent::VolumeRestored { mode: from, volume });
            }
            Err(e) => {
                warn!(mode = %from, volume, %e, "device rejected volume restore");
            }
        }
    }

    /// The device no longer looks the way the controller left it
    fn is_manual_change(&self, from: Mode, live_volume: u32) -> bool {
        self.state.last_mode != Some(from) || self.state.last_observed_volume != Some(live_volume)
    }

    fn emit(&self, event: StateEvent) {
        debug!(%event, "emitting state event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
