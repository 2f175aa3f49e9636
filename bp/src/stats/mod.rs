//! Throughput statistics
//!
//! A lock-protected ledger fed by servers and requesters, a derivation of
//! averages and utilization from its snapshots, and the reporters that
//! render them.

mod ledger;
mod report;

pub use ledger::{StatsLedger, StatsSnapshot};
pub use report::{FinalReport, Reporter, StatsSummary};
