//! Graceful shutdown for a running session.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to every task
//! that subscribed (the CLI's watch loop, the session bridge).

use std::io;

use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

/// Coordinates graceful shutdown.
///
/// Tasks call [`subscribe`](Self::subscribe) and `select!` on the receiver
/// alongside their own work. When shutdown is triggered, either by an OS
/// signal or programmatically, every receiver is notified.
#[derive(Clone)]
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => { res?; info!("received SIGINT, shutting down"); }
                _ = terminate.recv() => { info!("received SIGTERM, shutting down"); }
            }
        }
        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("received Ctrl-C, shutting down");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
