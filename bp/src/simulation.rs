//! Simulation driver
//!
//! Spawns one task per server, one per requester and one periodic reporter,
//! lets them run for the configured budget (or until an external stop),
//! then initiates shutdown, joins every actor and renders the final report.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::Config;
use crate::delay::Delay;
use crate::error::SimulationError;
use crate::gate::Gate;
use crate::requester::{Requester, RequesterReport};
use crate::sink::ReportSink;
use crate::station::{Server, ServerReport, Station};
use crate::stats::{FinalReport, Reporter, StatsLedger, StatsSnapshot};

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub report: FinalReport,
    pub snapshot: StatsSnapshot,
    pub servers: Vec<ServerReport>,
    pub requesters: Vec<RequesterReport>,
    pub periodic_reports: u64,
}

pub struct Simulation {
    config: Config,
    delay: Arc<dyn Delay>,
    sink: Arc<dyn ReportSink>,
}

async fn join_named<T>(
    handles: Vec<JoinHandle<T>>,
    kind: &str,
    first_id: usize,
) -> Result<Vec<T>, SimulationError> {
    join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(idx, joined)| {
            joined.map_err(|source| SimulationError::ActorPanicked {
                actor: format!("{} {}", kind, idx + first_id),
                source,
            })
        })
        .collect()
}

impl Simulation {
    /// The config is expected to have passed [`Config::validate`]
    pub fn new(config: Config, delay: Arc<dyn Delay>, sink: Arc<dyn ReportSink>) -> Self {
        debug!(?config, "Simulation::new: called");
        Self { config, delay, sink }
    }

    /// Run for the configured duration
    pub async fn run(self) -> Result<SimulationOutcome, SimulationError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run for the configured duration, or until `stop` completes first
    pub async fn run_until<F>(self, stop: F) -> Result<SimulationOutcome, SimulationError>
    where
        F: Future<Output = ()>,
    {
        debug!("Simulation::run_until: called");
        let started_at = Instant::now();
        let config = &self.config;

        let ledger = Arc::new(StatsLedger::new());
        let station = Arc::new(Station::new(config.servers, config.capacity, ledger.clone()));
        let gate = Arc::new(Gate::new());
        let base_seed = config.seed.unwrap_or_else(rand::random);

        info!(
            requesters = config.requesters,
            servers = config.servers,
            capacity = config.capacity,
            base_seed,
            "Simulation starting"
        );

        let reporter = Reporter::new(
            ledger.clone(),
            self.sink.clone(),
            config.report_interval(),
            config.capacity,
            station.run_state(),
        );
        let reporter_handle = tokio::spawn(reporter.run());

        let server_handles: Vec<_> = station
            .slots()
            .iter()
            .map(|slot| {
                let server = Server::new(slot.clone(), station.clone(), config.server_timing(), self.delay.clone());
                tokio::spawn(server.run())
            })
            .collect();

        let requester_handles: Vec<_> = (1..=config.requesters)
            .map(|id| {
                let requester = Requester::new(
                    id,
                    station.clone(),
                    gate.clone(),
                    config.requester_timing(),
                    self.delay.clone(),
                    base_seed.wrapping_add(id as u64),
                );
                tokio::spawn(requester.run())
            })
            .collect();

        tokio::pin!(stop);
        tokio::select! {
            _ = tokio::time::sleep(config.run_duration()) => {
                debug!("Simulation::run_until: run duration elapsed");
            }
            _ = &mut stop => {
                info!("Stop requested before run duration elapsed");
            }
        }
        station.initiate_shutdown().await;

        let requesters = join_named(requester_handles, "requester", 1).await?;
        let servers = join_named(server_handles, "server", 1).await?;
        let periodic_reports = reporter_handle.await.map_err(|source| SimulationError::ActorPanicked {
            actor: "reporter".to_string(),
            source,
        })?;

        self.sink.emit("Simulation ended");
        let snapshot = ledger.snapshot().await;
        let report = FinalReport::new(&snapshot, config.capacity, started_at.elapsed());
        info!(
            served = snapshot.requesters_served,
            batches = snapshot.batches_completed,
            "Simulation finished"
        );

        Ok(SimulationOutcome {
            report,
            snapshot,
            servers,
            requesters,
            periodic_reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::TokioDelay;
    use crate::sink::MemorySink;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_external_stop_ends_run_early() {
        let config = Config {
            requesters: 3,
            run_secs: 3600,
            seed: Some(1),
            ..Default::default()
        };
        let sink = Arc::new(MemorySink::new());
        let simulation = Simulation::new(config, Arc::new(TokioDelay), sink.clone());

        let start = Instant::now();
        let outcome = simulation
            .run_until(tokio::time::sleep(Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(3600));
        assert_eq!(outcome.requesters.len(), 3);
        assert_eq!(outcome.servers.len(), 1);
        assert!(sink.lines().iter().any(|l| l == "Simulation ended"));
    }
}
