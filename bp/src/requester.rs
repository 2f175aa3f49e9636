//! Requester actor
//!
//! Each requester loops: explore, get a ticket at the gate, wait for a seat,
//! ride, get off. It leaves the loop as soon as it observes that the run has
//! stopped at any of those points.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::delay::Delay;
use crate::gate::Gate;
use crate::station::{Station, UnboardOutcome};

/// Durations a requester works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequesterTiming {
    /// How long the gate is held for ticket issuance
    pub ticket: Duration,
    /// Shortest exploration between rides
    pub explore_min: Duration,
    /// Longest exploration between rides
    pub explore_max: Duration,
}

/// Where in its loop a requester noticed the run had stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitPoint {
    Exploring,
    /// Queued at the gate
    Gate,
    Boarding,
    /// Aboard a batch that was abandoned before it closed
    Aboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequesterReport {
    pub requester_id: usize,
    pub rides: u64,
    pub exit: ExitPoint,
}

pub struct Requester {
    id: usize,
    station: Arc<Station>,
    gate: Arc<Gate>,
    timing: RequesterTiming,
    delay: Arc<dyn Delay>,
    rng: StdRng,
}

impl Requester {
    pub fn new(
        id: usize,
        station: Arc<Station>,
        gate: Arc<Gate>,
        timing: RequesterTiming,
        delay: Arc<dyn Delay>,
        seed: u64,
    ) -> Self {
        debug!(id, ?timing, seed, "Requester::new: called");
        Self {
            id,
            station,
            gate,
            timing,
            delay,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Pick an exploration time, uniformly in whole seconds
    fn explore_duration(&mut self) -> Duration {
        let min = self.timing.explore_min.as_secs();
        let max = self.timing.explore_max.as_secs().max(min);
        Duration::from_secs(self.rng.random_range(min..=max))
    }

    pub async fn run(mut self) -> RequesterReport {
        debug!(id = self.id, "Requester::run: called");
        let run_state = self.station.run_state();
        let mut rides = 0;

        let exit = loop {
            let explore = self.explore_duration();
            info!(id = self.id, "Requester {} exploring for {} seconds", self.id, explore.as_secs());
            tokio::select! {
                _ = run_state.stopped() => break ExitPoint::Exploring,
                _ = self.delay.sleep(explore) => {}
            }
            if !run_state.is_running() {
                break ExitPoint::Exploring;
            }

            let queued_at = Instant::now();
            let ticket = tokio::select! {
                _ = run_state.stopped() => break ExitPoint::Gate,
                ticket = self.gate.enter() => ticket,
            };
            info!(id = self.id, "Requester {} getting ticket", self.id);
            self.delay.sleep(self.timing.ticket).await;
            ticket.exit();
            self.station.ledger().record_gate_wait(queued_at.elapsed()).await;
            info!(id = self.id, "Requester {} got ticket", self.id);

            let waiting_since = Instant::now();
            let Some(boarding) = self.station.board().await else {
                break ExitPoint::Boarding;
            };
            self.station.ledger().record_service_wait(waiting_since.elapsed()).await;
            info!(
                id = self.id,
                server_id = boarding.server_id(),
                "Requester {} boarded server {} ({} seated)",
                self.id,
                boarding.server_id(),
                boarding.seat()
            );

            let server_id = boarding.server_id();
            match boarding.unboard().await {
                UnboardOutcome::Unboarded => {
                    rides += 1;
                    info!(id = self.id, server_id, "Requester {} unboarded server {}", self.id, server_id);
                }
                UnboardOutcome::Abandoned => break ExitPoint::Aboard,
            }
        };

        info!(id = self.id, rides, ?exit, "Requester {} exiting", self.id);
        RequesterReport {
            requester_id: self.id,
            rides,
            exit,
        }
    }
}
