//! Cooperative shutdown signal
//!
//! The daemon owns a [`ShutdownTrigger`]; every worker holds a cloned
//! [`Shutdown`] and checks it at the top of each tick and while waiting for
//! the next one. Dropping the trigger counts as a shutdown request.

use tokio::sync::watch;

/// Sending half: fires shutdown for every [`Shutdown`] handle
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Receiving half, cheap to clone
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/handle pair
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    /// Request shutdown
    pub fn trigger(&self) {
        // Err only means every handle is already gone
        let _ = self.tx.send(true);
    }

    /// Another handle connected to this trigger
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait until shutdown is requested
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
