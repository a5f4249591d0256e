//! IPC module for daemon-tile communication

mod protocol;
mod server;

pub use protocol::{read_frame, write_frame, DaemonStatus, Notification, Request, Response};
pub use server::{DaemonContext, Server};
