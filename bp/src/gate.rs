//! Ticket gate
//!
//! A single-occupant critical section every requester passes before it may
//! board. Waiters are admitted in arrival order: tokio's mutex queues
//! lockers fairly, so no extra queue is kept here.

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One-at-a-time ticket counter
#[derive(Debug, Default)]
pub struct Gate {
    lock: Mutex<()>,
}

/// Held gate. Dropping it lets the next waiter in.
#[derive(Debug)]
pub struct GateTicket<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other actor holds the gate, then take it
    pub async fn enter(&self) -> GateTicket<'_> {
        debug!("Gate::enter: called");
        let guard = self.lock.lock().await;
        GateTicket { _guard: guard }
    }

    #[cfg(test)]
    fn try_enter(&self) -> Option<GateTicket<'_>> {
        self.lock.try_lock().ok().map(|guard| GateTicket { _guard: guard })
    }
}

impl GateTicket<'_> {
    /// Release the gate explicitly
    pub fn exit(self) {
        debug!("GateTicket::exit: called");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_occupant() {
        let gate = Gate::new();
        let ticket = gate.enter().await;
        assert!(gate.try_enter().is_none());
        ticket.exit();
        assert!(gate.try_enter().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_admitted_in_arrival_order() {
        let gate = Arc::new(Gate::new());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let held = gate.enter().await;
        let mut handles = Vec::new();
        for id in 0..5 {
            let gate = gate.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _ticket = gate.enter().await;
                order.lock().unwrap().push(id);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }));
            // Let this waiter queue up before the next one arrives
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        drop(held);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_serializes_occupants() {
        let gate = Arc::new(Gate::new());
        let start = tokio::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                let _ticket = gate.enter().await;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
