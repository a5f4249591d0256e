//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! state events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::device::{AudioDevice, Stream};
use crate::events::StateEvent;
use crate::settings::{ExclusionSet, Settings};
use crate::state::{ModeController, TileState, ToggleOutcome};

use super::protocol::{read_frame, write_frame, DaemonStatus, Notification, Request, Response};

/// Everything request handlers need, shared by all client connections
pub struct DaemonContext {
    /// The single controller; every transition and query goes through this lock
    pub controller: Arc<Mutex<ModeController>>,
    pub device: Arc<dyn AudioDevice>,
    pub settings_path: PathBuf,
    pub event_tx: broadcast::Sender<StateEvent>,
    pub start_time: Instant,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: Arc<DaemonContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(socket_path: &Path, context: DaemonContext) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: Arc::new(context),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, context: Arc<DaemonContext>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Frames are read on their own task so a half-read frame is never
        // dropped when a notification is written in between.
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut events: Option<broadcast::Receiver<StateEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        debug!("client disconnected");
                        break Ok(());
                    };

                    let response = match request {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if request == Request::Subscribe && events.is_none() {
                                events = Some(context.event_tx.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            Self::process_request(request, &context).await
                        }
                        Err(message) => Response::error("bad_request", message),
                    };

                    if let Err(e) = write_frame(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut events) => {
                    match event {
                        Ok(event) => {
                            let note = Notification::Event { event };
                            if let Err(e) = write_frame(&mut writer, &note).await {
                                break Err(e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged, notifications dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            events = None;
                        }
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Decode frames into requests until the client goes away
    async fn read_requests(
        mut reader: OwnedReadHalf,
        request_tx: mpsc::Sender<std::result::Result<Request, String>>,
    ) {
        loop {
            let body = match read_frame(&mut reader).await {
                Ok(Some(body)) => body,
                Ok(None) => return,
                Err(e) => {
                    warn!(?e, "unreadable frame, disconnecting");
                    return;
                }
            };

            let request = serde_json::from_slice::<Request>(&body)
                .map_err(|e| format!("failed to parse request: {e}"));

            if request_tx.send(request).await.is_err() {
                return;
            }
        }
    }

    /// Process a request and return a response
    pub async fn process_request(request: Request, context: &DaemonContext) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let settings = Settings::load_or_default(&context.settings_path);
                let controller = context.controller.lock().await;
                let mode = controller.current_mode();

                Response::Status(DaemonStatus {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    mode,
                    last_mode: controller.state().last_mode,
                    tile: TileState::for_mode(mode),
                    excluded_modes: settings.excluded_modes.names().map(String::from).collect(),
                    policy_access_granted: context.device.is_policy_access_granted(),
                    uptime_secs: context.start_time.elapsed().as_secs(),
                })
            }

            Request::Toggle => {
                // Without policy access the controller is never invoked
                if !context.device.is_policy_access_granted() {
                    warn!("toggle refused, policy access not granted");
                    return Response::error(
                        "policy_access_denied",
                        "grant notification policy access to change the ringer",
                    );
                }

                let exclusions = Settings::load_or_default(&context.settings_path).excluded_modes;
                let mut controller = context.controller.lock().await;
                match controller.toggle(&exclusions) {
                    Ok(ToggleOutcome::Switched { from, to }) => Response::Toggled { from, to },
                    Ok(ToggleOutcome::NoEligibleMode) => Response::NoEligibleMode,
                    Err(e) => {
                        error!(?e, "toggle applied but state was not saved");
                        Response::error("persist_failed", e)
                    }
                }
            }

            Request::Refresh => {
                let controller = context.controller.lock().await;
                Response::Tile(controller.refresh_display())
            }

            Request::GetExclusions => {
                let settings = Settings::load_or_default(&context.settings_path);
                Response::Exclusions {
                    modes: settings.excluded_modes.names().map(String::from).collect(),
                }
            }

            Request::SetExclusions { modes } => {
                let excluded_modes = match ExclusionSet::from_mode_names(&modes) {
                    Ok(set) => set,
                    Err(e) => return Response::error("unknown_mode", e),
                };

                match (Settings { excluded_modes }).save(&context.settings_path) {
                    Ok(()) => {
                        info!(?modes, "exclusions updated");
                        Response::Ok
                    }
                    Err(e) => {
                        error!(?e, "failed to save exclusions");
                        Response::error("settings_write_failed", e)
                    }
                }
            }

            Request::SetRinger { ringer } => match context.device.set_ringer_mode(ringer) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error("device_rejected", e),
            },

            Request::SetVolume { volume } => {
                match context.device.set_stream_volume(Stream::Music, volume) {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::error("device_rejected", e),
                }
            }

            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; never resolves for unsubscribed ones
async fn next_event(
    events: &mut Option<broadcast::Receiver<StateEvent>>,
) -> std::result::Result<StateEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
