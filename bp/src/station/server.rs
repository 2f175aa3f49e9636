//! Server actor: drives its slot through load, run, unload cycles

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::delay::Delay;

use super::slot::{BatchSlot, BoardingEnd};
use super::station::Station;

/// Durations a server works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerTiming {
    /// How long boarding stays open before a partial batch leaves
    pub boarding_wait: Duration,
    /// Length of the committed service phase
    pub service: Duration,
}

/// One batch that went through service and unloading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    pub server_id: usize,
    pub cycle: u64,
    pub boarded: usize,
    pub unboarded: usize,
    pub ended_by: BoardingEnd,
}

/// What a single cycle produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(BatchRecord),
    /// Boarding window elapsed with nobody aboard
    Empty,
    /// The run stopped; the server is done
    Closed,
}

/// Everything a server did before it closed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerReport {
    pub server_id: usize,
    pub batches: Vec<BatchRecord>,
    pub empty_timeouts: u64,
}

impl ServerReport {
    pub fn requesters_served(&self) -> u64 {
        self.batches.iter().map(|b| b.boarded as u64).sum()
    }
}

pub struct Server {
    slot: Arc<BatchSlot>,
    station: Arc<Station>,
    timing: ServerTiming,
    delay: Arc<dyn Delay>,
}

impl Server {
    /// Create the server that owns `slot`. The slot must belong to `station`.
    pub fn new(slot: Arc<BatchSlot>, station: Arc<Station>, timing: ServerTiming, delay: Arc<dyn Delay>) -> Self {
        debug!(server_id = slot.server_id(), ?timing, "Server::new: called");
        Self {
            slot,
            station,
            timing,
            delay,
        }
    }

    pub fn id(&self) -> usize {
        self.slot.server_id()
    }

    /// Run cycles until the run stops
    pub async fn run(self) -> ServerReport {
        debug!(server_id = self.id(), "Server::run: called");
        let mut report = ServerReport {
            server_id: self.id(),
            ..Default::default()
        };
        loop {
            match self.run_cycle().await {
                CycleOutcome::Completed(record) => report.batches.push(record),
                CycleOutcome::Empty => report.empty_timeouts += 1,
                CycleOutcome::Closed => break,
            }
        }
        info!(server_id = self.id(), batches = report.batches.len(), "Server {} exiting", self.id());
        report
    }

    /// One full cycle: load, run, unload
    pub async fn run_cycle(&self) -> CycleOutcome {
        let server_id = self.id();
        let capacity = self.slot.capacity();

        let Some(cycle) = self.slot.begin_loading().await else {
            debug!(server_id, "Server::run_cycle: stopped before loading");
            return CycleOutcome::Closed;
        };
        info!(server_id, cycle, "Server {} loading requesters", server_id);
        self.station.announce_loading();

        let deadline = Instant::now() + self.timing.boarding_wait;
        let closed = self.slot.await_boarding(deadline).await;
        match closed.end {
            BoardingEnd::Shutdown => {
                info!(server_id, cycle, boarded = closed.boarded, "Server {} abandoning unfinished batch", server_id);
                return CycleOutcome::Closed;
            }
            BoardingEnd::TimedOut if closed.boarded == 0 => {
                debug!(server_id, cycle, "Server::run_cycle: timed out empty");
                return CycleOutcome::Empty;
            }
            BoardingEnd::TimedOut => {
                info!(
                    server_id,
                    cycle,
                    "Server {} timed out with {}/{} requesters",
                    server_id,
                    closed.boarded,
                    capacity
                );
            }
            BoardingEnd::Full => {}
        }

        // Capacity is fixed now, so the batch counts from the moment it starts
        self.station.ledger().record_batch_completion(closed.boarded).await;
        info!(server_id, cycle, boarded = closed.boarded, "Server {} running batch", server_id);
        self.delay.sleep(self.timing.service).await;

        self.slot.begin_unloading().await;
        let unboarded = self.slot.await_unboarded().await;
        info!(server_id, cycle, unboarded, "Server {} unloading complete", server_id);

        CycleOutcome::Completed(BatchRecord {
            server_id,
            cycle,
            boarded: closed.boarded,
            unboarded,
            ended_by: closed.end,
        })
    }
}
