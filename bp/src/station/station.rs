//! The shared rendezvous point
//!
//! Holds one [`BatchSlot`] per server, the `loading_started` condition that
//! every slot shares, the ledger, and the shutdown switch. Requesters board
//! the first server that is loading with a free seat.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::shutdown::{RunState, Shutdown};
use crate::stats::StatsLedger;

use super::slot::{BatchSlot, Boarding, TryBoard};

pub struct Station {
    slots: Vec<Arc<BatchSlot>>,
    loading_started: Notify,
    shutdown: Shutdown,
    ledger: Arc<StatsLedger>,
}

impl Station {
    /// Create a station with `servers` independent slots, numbered from 1
    pub fn new(servers: usize, capacity: usize, ledger: Arc<StatsLedger>) -> Self {
        debug!(servers, capacity, "Station::new: called");
        let shutdown = Shutdown::new();
        let slots = (1..=servers)
            .map(|server_id| Arc::new(BatchSlot::new(server_id, capacity, shutdown.run_state())))
            .collect();
        Self {
            slots,
            loading_started: Notify::new(),
            shutdown,
            ledger,
        }
    }

    pub fn slots(&self) -> &[Arc<BatchSlot>] {
        &self.slots
    }

    /// Slot for a 1-based server id
    pub fn slot(&self, server_id: usize) -> Option<&Arc<BatchSlot>> {
        server_id.checked_sub(1).and_then(|idx| self.slots.get(idx))
    }

    pub fn ledger(&self) -> &Arc<StatsLedger> {
        &self.ledger
    }

    pub fn run_state(&self) -> RunState {
        self.shutdown.run_state()
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Wake every requester waiting for a server to start loading
    pub(crate) fn announce_loading(&self) {
        self.loading_started.notify_waiters();
    }

    /// Wait for any server to open boarding and take a seat.
    ///
    /// Returns `None` once the run has stopped; a requester that gets `None`
    /// never incremented any slot's boarded count.
    pub async fn board(&self) -> Option<Boarding> {
        debug!("Station::board: called");
        loop {
            let notified = self.loading_started.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_running() {
                debug!("Station::board: stopped before boarding");
                return None;
            }
            for slot in &self.slots {
                match slot.try_board().await {
                    TryBoard::Boarded(boarding) => return Some(boarding),
                    TryBoard::Stopped => return None,
                    TryBoard::Unavailable => {}
                }
            }

            notified.await;
        }
    }

    /// Stop the run and wake every actor parked on any condition.
    ///
    /// Only the first call flips the running flag and returns `true`. Later
    /// calls re-broadcast, which is harmless, and return `false`.
    pub async fn initiate_shutdown(&self) -> bool {
        debug!("Station::initiate_shutdown: called");
        let initiated = self.shutdown.trigger();
        if initiated {
            info!("Shutdown initiated");
        }
        for slot in &self.slots {
            slot.wake_all().await;
        }
        self.loading_started.notify_waiters();
        initiated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn station(servers: usize, capacity: usize) -> Arc<Station> {
        Arc::new(Station::new(servers, capacity, Arc::new(StatsLedger::new())))
    }

    #[test]
    fn test_slots_are_independent_and_numbered() {
        let station = station(3, 4);
        assert_eq!(station.slots().len(), 3);
        assert_eq!(station.slot(1).map(|s| s.server_id()), Some(1));
        assert_eq!(station.slot(3).map(|s| s.server_id()), Some(3));
        assert!(station.slot(0).is_none());
        assert!(station.slot(4).is_none());
        assert!(!Arc::ptr_eq(&station.slots()[0], &station.slots()[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_waits_for_loading() {
        let station = station(1, 2);
        let rider = {
            let station = station.clone();
            tokio::spawn(async move { station.board().await.map(|b| (b.server_id(), b.seat())) })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!rider.is_finished());

        let slot = station.slot(1).unwrap();
        slot.begin_loading().await;
        station.announce_loading();

        assert_eq!(rider.await.unwrap(), Some((1, 1)));
        assert_eq!(slot.view().await.boarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_picks_first_loading_server() {
        let station = station(2, 2);
        let second = station.slot(2).unwrap();
        second.begin_loading().await;
        station.announce_loading();

        let boarding = station.board().await.expect("a seat on server 2");
        assert_eq!(boarding.server_id(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_waiting_requesters() {
        let station = station(1, 5);
        let mut riders = Vec::new();
        for _ in 0..3 {
            let station = station.clone();
            riders.push(tokio::spawn(async move { station.board().await.is_some() }));
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(station.initiate_shutdown().await);

        for rider in riders {
            assert!(!rider.await.unwrap(), "no requester should board after shutdown");
        }
        assert_eq!(station.slot(1).unwrap().view().await.boarded, 0);
        assert_eq!(station.ledger().snapshot().await.requesters_served, 0);
    }

    #[tokio::test]
    async fn test_shutdown_idempotent() {
        let station = station(2, 5);
        assert!(station.initiate_shutdown().await);
        let first = (station.is_running(), station.slot(1).unwrap().view().await);

        assert!(!station.initiate_shutdown().await);
        let second = (station.is_running(), station.slot(1).unwrap().view().await);

        assert_eq!(first, second);
        assert!(!station.is_running());
    }
}
