//! Error types
//!
//! Boarding timeouts and shutdown are ordinary outcomes of the coordination
//! protocol and are reported as values, not errors. What remains fatal is a
//! bad configuration, or an actor that panicked.

use thiserror::Error;

/// Invalid startup parameters. Fatal: the run never starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a positive integer")]
    NonPositive { field: &'static str },

    #[error("capacity {capacity} exceeds the maximum of {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("explore-min-secs ({min}) is greater than explore-max-secs ({max})")]
    InvertedExploreRange { min: u64, max: u64 },
}

/// Failures while driving a simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{actor} panicked: {source}")]
    ActorPanicked {
        actor: String,
        #[source]
        source: tokio::task::JoinError,
    },
}
