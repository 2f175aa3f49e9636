//! Shared throughput counters

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

/// Point-in-time copy of every ledger counter, taken under one lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requesters_served: u64,
    pub batches_completed: u64,
    pub gate_wait_total: Duration,
    pub gate_wait_samples: u64,
    pub service_wait_total: Duration,
    pub service_wait_samples: u64,
}

/// Lock-protected counters fed by servers and requesters.
///
/// Every counter only grows. Related fields are always updated together so a
/// [`snapshot`](StatsLedger::snapshot) never sees a batch without its riders.
#[derive(Debug, Default)]
pub struct StatsLedger {
    inner: Mutex<StatsSnapshot>,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time a requester spent getting through the gate
    pub async fn record_gate_wait(&self, wait: Duration) {
        debug!(wait_ms = wait.as_millis() as u64, "StatsLedger::record_gate_wait: called");
        let mut inner = self.inner.lock().await;
        inner.gate_wait_total += wait;
        inner.gate_wait_samples += 1;
    }

    /// Time a requester spent waiting for a seat
    pub async fn record_service_wait(&self, wait: Duration) {
        debug!(wait_ms = wait.as_millis() as u64, "StatsLedger::record_service_wait: called");
        let mut inner = self.inner.lock().await;
        inner.service_wait_total += wait;
        inner.service_wait_samples += 1;
    }

    /// A batch of `boarded` requesters entered service
    pub async fn record_batch_completion(&self, boarded: usize) {
        debug!(boarded, "StatsLedger::record_batch_completion: called");
        let mut inner = self.inner.lock().await;
        inner.batches_completed += 1;
        inner.requesters_served += boarded as u64;
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        *self.inner.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_snapshot() {
        let ledger = StatsLedger::new();
        assert_eq!(ledger.snapshot().await, StatsSnapshot::default());
    }

    #[tokio::test]
    async fn test_records_accumulate() {
        let ledger = StatsLedger::new();
        ledger.record_gate_wait(Duration::from_millis(1000)).await;
        ledger.record_gate_wait(Duration::from_millis(3000)).await;
        ledger.record_service_wait(Duration::from_millis(500)).await;
        ledger.record_batch_completion(5).await;
        ledger.record_batch_completion(2).await;

        let snap = ledger.snapshot().await;
        assert_eq!(snap.gate_wait_samples, 2);
        assert_eq!(snap.gate_wait_total, Duration::from_millis(4000));
        assert_eq!(snap.service_wait_samples, 1);
        assert_eq!(snap.service_wait_total, Duration::from_millis(500));
        assert_eq!(snap.batches_completed, 2);
        assert_eq!(snap.requesters_served, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_never_torn() {
        let ledger = Arc::new(StatsLedger::new());

        let mut writers = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            writers.push(tokio::spawn(async move {
                for _ in 0..250 {
                    ledger.record_batch_completion(3).await;
                }
            }));
        }

        // Each batch carries exactly 3 riders, so every snapshot must agree
        for _ in 0..100 {
            let snap = ledger.snapshot().await;
            assert_eq!(snap.requesters_served, snap.batches_completed * 3);
            tokio::task::yield_now().await;
        }

        for writer in writers {
            writer.await.unwrap();
        }
        let snap = ledger.snapshot().await;
        assert_eq!(snap.batches_completed, 1000);
        assert_eq!(snap.requesters_served, 3000);
    }
}
