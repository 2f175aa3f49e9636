//! CLI argument parsing for batchpark

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// Final report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Command line flags. Anything set here overrides the config file.
#[derive(Parser, Debug)]
#[command(name = "bp")]
#[command(author, version, about = "Capacity-bounded batch rendezvous simulator", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of requesters
    #[arg(short = 'n', long)]
    pub requesters: Option<usize>,

    /// Number of servers
    #[arg(short = 'c', long, visible_short_alias = 's')]
    pub servers: Option<usize>,

    /// Seats per batch
    #[arg(short = 'p', long)]
    pub capacity: Option<usize>,

    /// Seconds boarding stays open before a partial batch leaves
    #[arg(short = 'w', long = "wait")]
    pub boarding_wait_secs: Option<u64>,

    /// Seconds each batch spends in service
    #[arg(short = 'r', long = "ride")]
    pub service_secs: Option<u64>,

    /// Seconds to run before shutting down
    #[arg(short = 'd', long = "duration")]
    pub run_secs: Option<u64>,

    /// Seconds the gate is held per ticket
    #[arg(long = "ticket-secs")]
    pub ticket_secs: Option<u64>,

    /// Shortest exploration between rides, in seconds
    #[arg(long = "explore-min")]
    pub explore_min_secs: Option<u64>,

    /// Longest exploration between rides, in seconds
    #[arg(long = "explore-max")]
    pub explore_max_secs: Option<u64>,

    /// Seconds between statistics reports
    #[arg(short = 'i', long = "interval")]
    pub report_interval_secs: Option<u64>,

    /// Seed for exploration times
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Final report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Cli {
    /// Overlay every flag that was given onto `config`
    pub fn apply_to(&self, config: &mut Config) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.requesters, &self.requesters);
        set(&mut config.servers, &self.servers);
        set(&mut config.capacity, &self.capacity);
        set(&mut config.boarding_wait_secs, &self.boarding_wait_secs);
        set(&mut config.service_secs, &self.service_secs);
        set(&mut config.run_secs, &self.run_secs);
        set(&mut config.ticket_secs, &self.ticket_secs);
        set(&mut config.explore_min_secs, &self.explore_min_secs);
        set(&mut config.explore_max_secs, &self.explore_max_secs);
        set(&mut config.report_interval_secs, &self.report_interval_secs);
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.log_level.is_some() {
            config.log_level = self.log_level.clone();
        }
    }
}
