//! Batch coordinator
//!
//! Servers form capacity-bounded batches from requesters that reach the
//! station. A batch is boarded until it is full or the boarding window
//! elapses, then serviced (never interrupted), then released through an
//! unloading barrier before the server starts over.

mod server;
mod slot;
#[allow(clippy::module_inception)]
mod station;

pub use server::{BatchRecord, CycleOutcome, Server, ServerReport, ServerTiming};
pub use slot::{BatchSlot, Boarding, BoardingEnd, LoadingClosed, Phase, SlotView, TryBoard, UnboardOutcome};
pub use station::Station;
