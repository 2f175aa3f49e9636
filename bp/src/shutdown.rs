//! Cooperative shutdown
//!
//! A single `running` flag, shared by every actor through a watch channel.
//! The flag goes from `true` to `false` exactly once. Actors either read it
//! while evaluating a wait predicate ([`RunState::is_running`]) or await the
//! transition directly ([`RunState::stopped`]).

use tokio::sync::watch;
use tracing::debug;

/// Owner side of the running flag. Only the holder can stop the run.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a new shutdown coordinator in the running state
    pub fn new() -> Self {
        debug!("Shutdown::new: called");
        let (tx, _rx) = watch::channel(true);
        Self { tx }
    }

    /// Hand out a read-only view of the running flag
    pub fn run_state(&self) -> RunState {
        RunState { rx: self.tx.subscribe() }
    }

    /// Flip `running` to false.
    ///
    /// Returns `true` only for the call that performed the transition; any
    /// later call leaves the flag untouched and returns `false`.
    pub fn trigger(&self) -> bool {
        debug!("Shutdown::trigger: called");
        let initiated = self.tx.send_if_modified(|running| {
            if *running {
                *running = false;
                true
            } else {
                false
            }
        });
        debug!(initiated, "Shutdown::trigger: done");
        initiated
    }

    /// Whether the run is still active
    pub fn is_running(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Cancellation context handed to every actor
#[derive(Debug, Clone)]
pub struct RunState {
    rx: watch::Receiver<bool>,
}

impl RunState {
    /// Read the flag. Callers must re-check after every wake-up.
    pub fn is_running(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the run has been stopped. Returns immediately if it
    /// already has been.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        // Err means the sender is gone, which can only happen after the
        // owning Shutdown was dropped; treat that as stopped too.
        let _ = rx.wait_for(|running| !*running).await;
    }
}
