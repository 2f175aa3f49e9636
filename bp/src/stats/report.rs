//! Derived statistics and the periodic/final reporters

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::shutdown::RunState;
use crate::sink::{ReportSink, format_hms};

use super::ledger::{StatsLedger, StatsSnapshot};

/// Figures derived from a snapshot. Every ratio is zero when its
/// denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub requesters_served: u64,
    pub batches_completed: u64,
    pub capacity: usize,
    pub avg_gate_wait_ms: f64,
    pub avg_service_wait_ms: f64,
    pub utilization_pct: f64,
    pub mean_batch_size: f64,
}

fn average_ms(total: Duration, samples: u64) -> f64 {
    if samples == 0 {
        0.0
    } else {
        total.as_secs_f64() * 1000.0 / samples as f64
    }
}

impl StatsSummary {
    pub fn derive(snapshot: &StatsSnapshot, capacity: usize) -> Self {
        let batches = snapshot.batches_completed;
        let served = snapshot.requesters_served;

        let seats = batches as f64 * capacity as f64;
        let utilization_pct = if seats > 0.0 { 100.0 * served as f64 / seats } else { 0.0 };
        let mean_batch_size = if batches > 0 { served as f64 / batches as f64 } else { 0.0 };

        Self {
            requesters_served: served,
            batches_completed: batches,
            capacity,
            avg_gate_wait_ms: average_ms(snapshot.gate_wait_total, snapshot.gate_wait_samples),
            avg_service_wait_ms: average_ms(snapshot.service_wait_total, snapshot.service_wait_samples),
            utilization_pct,
            mean_batch_size,
        }
    }

    /// Lines shared by the periodic and the final report
    fn body_lines(&self) -> Vec<String> {
        vec![
            format!("  Total requesters served: {}", self.requesters_served),
            format!("  Total batches completed: {}", self.batches_completed),
            format!("  Avg gate wait: {:.1} ms", self.avg_gate_wait_ms),
            format!("  Avg service wait: {:.1} ms", self.avg_service_wait_ms),
            format!(
                "  Server utilization: {:.0}% ({:.1}/{} per batch)",
                self.utilization_pct, self.mean_batch_size, self.capacity
            ),
        ]
    }

    /// Lines for one periodic report
    pub fn periodic_lines(&self) -> Vec<String> {
        let mut lines = vec!["[Monitor] Current statistics:".to_string()];
        lines.extend(self.body_lines());
        lines
    }
}

/// Summary rendered once every actor has terminated
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub elapsed_secs: u64,
    #[serde(flatten)]
    pub summary: StatsSummary,
}

impl FinalReport {
    pub fn new(snapshot: &StatsSnapshot, capacity: usize, elapsed: Duration) -> Self {
        Self {
            elapsed_secs: elapsed.as_secs(),
            summary: StatsSummary::derive(snapshot, capacity),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "[Monitor] FINAL STATISTICS:".to_string(),
            format!("  Total simulation time: {}", format_hms(self.elapsed_secs)),
        ];
        lines.extend(self.summary.body_lines());
        lines
    }

    pub fn emit(&self, sink: &dyn ReportSink) {
        for line in self.lines() {
            sink.emit(&line);
        }
    }
}

/// Periodically renders a snapshot of the ledger until shutdown
pub struct Reporter {
    ledger: Arc<StatsLedger>,
    sink: Arc<dyn ReportSink>,
    interval: Duration,
    capacity: usize,
    run_state: RunState,
}

impl Reporter {
    pub fn new(
        ledger: Arc<StatsLedger>,
        sink: Arc<dyn ReportSink>,
        interval: Duration,
        capacity: usize,
        run_state: RunState,
    ) -> Self {
        Self {
            ledger,
            sink,
            interval,
            capacity,
            run_state,
        }
    }

    /// Run until shutdown, returning how many reports were emitted
    pub async fn run(self) -> u64 {
        debug!(interval = ?self.interval, "Reporter::run: called");
        let mut emitted = 0;
        loop {
            tokio::select! {
                _ = self.run_state.stopped() => {
                    debug!("Reporter::run: stopped during interval");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
            if !self.run_state.is_running() {
                break;
            }

            let snapshot = self.ledger.snapshot().await;
            let summary = StatsSummary::derive(&snapshot, self.capacity);
            for line in summary.periodic_lines() {
                self.sink.emit(&line);
            }
            emitted += 1;
        }
        info!(emitted, "Reporter exiting");
        emitted
    }
}
