//! BatchPark - capacity-bounded batch rendezvous
//!
//! Requesters and batch servers meet at a shared station. Each requester
//! passes a single-occupant ticket gate, then waits for a server that is
//! boarding. A server boards until its batch is full or its boarding window
//! elapses, runs the batch, and releases everyone through an unloading
//! barrier before it starts over. A reporter samples throughput while the run
//! is live, and a final report is rendered once every actor has stopped.
//!
//! # Modules
//!
//! - [`gate`] - FIFO ticket gate
//! - [`station`] - batch slots, servers, and the shared station
//! - [`requester`] - requester lifecycle
//! - [`shutdown`] - running flag and cancellation context
//! - [`stats`] - ledger, derived summary, reporters
//! - [`simulation`] - spawns, stops and joins every actor
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod delay;
pub mod error;
pub mod gate;
pub mod requester;
pub mod shutdown;
pub mod simulation;
pub mod sink;
pub mod station;
pub mod stats;

// Re-export commonly used types
pub use config::Config;
pub use delay::{Delay, NoDelay, TokioDelay};
pub use error::{ConfigError, SimulationError};
pub use gate::{Gate, GateTicket};
pub use requester::{ExitPoint, Requester, RequesterReport, RequesterTiming};
pub use shutdown::{RunState, Shutdown};
pub use simulation::{Simulation, SimulationOutcome};
pub use sink::{ConsoleSink, MemorySink, ReportSink};
pub use station::{
    BatchRecord, BatchSlot, Boarding, BoardingEnd, CycleOutcome, Phase, Server, ServerReport, ServerTiming, Station,
    UnboardOutcome,
};
pub use stats::{FinalReport, Reporter, StatsLedger, StatsSnapshot, StatsSummary};
