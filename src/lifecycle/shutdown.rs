//! Signal handling for graceful shutdown

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// Signal that ended the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Terminate,
    Interrupt,
}

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignal {
    /// Register the signal handlers.
    ///
    /// Registration happens up front so a signal arriving during startup is
    /// not lost.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for a shutdown signal
    pub async fn wait(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
                ShutdownReason::Terminate
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
                ShutdownReason::Interrupt
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handlers_register() {
        assert!(ShutdownSignal::new().is_ok());
    }
}
