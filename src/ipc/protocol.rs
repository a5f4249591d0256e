//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::device::RingerMode;
use crate::events::StateEvent;
use crate::modes::Mode;
use crate::state::TileState;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from the tile/UI to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Cycle to the next eligible mode (the tile was tapped)
    Toggle,

    /// Recompute the tile without changing anything
    Refresh,

    GetExclusions,

    /// Replace the set of modes skipped while cycling
    SetExclusions { modes: Vec<String> },

    /// Change the ringer directly, as a user would from system settings
    SetRinger { ringer: RingerMode },

    /// Change media volume directly, as a user would with the volume keys
    SetVolume { volume: u32 },

    /// Subscribe to state event notifications
    Subscribe,
}

/// Responses from daemon to the tile/UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Toggle switched modes
    Toggled { from: Option<Mode>, to: Mode },

    /// Toggle ignored, every mode is excluded
    NoEligibleMode,

    /// Current tile state
    Tile(TileState),

    Exclusions { modes: Vec<String> },

    /// Request applied
    Ok,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl ToString) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// State event occurred
    Event { event: StateEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Mode detected on the device, `None` if unknown
    pub mode: Option<Mode>,

    /// Mode the controller last switched to
    pub last_mode: Option<Mode>,

    pub tile: TileState,

    pub excluded_modes: Vec<String>,

    pub policy_access_granted: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

/// Read one frame body, `None` on a clean end of stream
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    anyhow::ensure!(len <= MAX_FRAME_LEN, "frame of {len} bytes exceeds limit");

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("truncated frame body")?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    let len = u32::try_from(body.len()).context("message too large")?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TileStatus;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetExclusions {
            modes: vec!["Vibrate".into()],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_exclusions"));
        assert!(json.contains("Vibrate"));

        let parsed: Request = serde_json::from_str(r#"{"type":"set_ringer","ringer":"silent"}"#).unwrap();
        assert_eq!(parsed, Request::SetRinger { ringer: RingerMode::Silent });
    }

    #[test]
    fn test_tile_response_flattens() {
        let resp = Response::Tile(TileState::for_mode(None));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"tile\""));
        assert!(json.contains("\"state\":\"unavailable\""));

        let back: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Response::Tile(TileState { state: TileStatus::Unavailable, .. })));
    }

    #[test]
    fn test_notification_nests_event() {
        let note = Notification::Event {
            event: StateEvent::NoEligibleMode,
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"type":"event","event":{"type":"no_eligible_mode"}}"#);
    }

    #[tokio::test]
    async fn test_frame_over_pipe() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_frame(&mut client, &Request::Toggle).await.unwrap();
        drop(client);

        let body = read_frame(&mut server).await.unwrap().unwrap();
        let request: Request = serde_json::from_slice(&body).unwrap();
        assert_eq!(request, Request::Toggle);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();

        assert!(read_frame(&mut server).await.is_err());
    }
}
