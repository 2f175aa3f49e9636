//! Simulation configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::requester::RequesterTiming;
use crate::station::ServerTiming;

/// File name looked up in the working and user config directories
const CONFIG_FILE: &str = "batchpark.yml";

/// Largest batch a server may carry
pub const MAX_CAPACITY: usize = 100;

/// Simulation parameters, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of requester actors
    pub requesters: usize,

    /// Number of server actors, each with its own batch slot
    pub servers: usize,

    /// Seats per batch
    pub capacity: usize,

    /// How long boarding stays open before a partial batch leaves
    #[serde(rename = "boarding-wait-secs")]
    pub boarding_wait_secs: u64,

    /// Length of the service phase
    #[serde(rename = "service-secs")]
    pub service_secs: u64,

    /// Wall-clock budget before shutdown is initiated
    #[serde(rename = "run-secs")]
    pub run_secs: u64,

    /// How long the gate is held for each ticket
    #[serde(rename = "ticket-secs")]
    pub ticket_secs: u64,

    /// Exploration range between rides, in whole seconds
    #[serde(rename = "explore-min-secs")]
    pub explore_min_secs: u64,

    #[serde(rename = "explore-max-secs")]
    pub explore_max_secs: u64,

    /// Interval between periodic statistics reports
    #[serde(rename = "report-interval-secs")]
    pub report_interval_secs: u64,

    /// Seed for exploration times; random when unset
    pub seed: Option<u64>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requesters: 10,
            servers: 1,
            capacity: 5,
            boarding_wait_secs: 8,
            service_secs: 6,
            run_secs: 10,
            ticket_secs: 1,
            explore_min_secs: 1,
            explore_max_secs: 5,
            report_interval_secs: 5,
            seed: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Check every parameter before any actor starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("requesters", self.requesters as u64),
            ("servers", self.servers as u64),
            ("capacity", self.capacity as u64),
            ("boarding-wait-secs", self.boarding_wait_secs),
            ("service-secs", self.service_secs),
            ("run-secs", self.run_secs),
            ("ticket-secs", self.ticket_secs),
            ("explore-min-secs", self.explore_min_secs),
            ("explore-max-secs", self.explore_max_secs),
            ("report-interval-secs", self.report_interval_secs),
        ];
        if let Some(&(field, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NonPositive { field });
        }

        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.capacity,
                max: MAX_CAPACITY,
            });
        }

        if self.explore_min_secs > self.explore_max_secs {
            return Err(ConfigError::InvertedExploreRange {
                min: self.explore_min_secs,
                max: self.explore_max_secs,
            });
        }

        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn server_timing(&self) -> ServerTiming {
        ServerTiming {
            boarding_wait: Duration::from_secs(self.boarding_wait_secs),
            service: Duration::from_secs(self.service_secs),
        }
    }

    pub fn requester_timing(&self) -> RequesterTiming {
        RequesterTiming {
            ticket: Duration::from_secs(self.ticket_secs),
            explore_min: Duration::from_secs(self.explore_min_secs),
            explore_max: Duration::from_secs(self.explore_max_secs),
        }
    }

    /// Places searched when no explicit path is given, most specific first:
    /// `./batchpark.yml`, then `batchpark/batchpark.yml` under the user
    /// config dir.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("batchpark").join(CONFIG_FILE));
        }
        paths
    }

    /// Load from `config_path`, which must parse, or else from the first
    /// readable file in [`Config::search_paths`], or else defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            let config = Self::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            info!(path = %path.display(), "Loaded config");
            return Ok(config);
        }

        for path in Self::search_paths().iter().filter(|path| path.exists()) {
            match Self::from_yaml_file(path) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded config");
                    return Ok(config);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable config"),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Resolve just the log level, before logging is set up. Silent on errors;
    /// the full [`Config::load`] reports them.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let config = match config_path {
            Some(path) => Self::from_yaml_file(path).ok()?,
            None => Self::search_paths()
                .iter()
                .filter(|path| path.exists())
                .find_map(|path| Self::from_yaml_file(path).ok())?,
        };
        config.log_level
    }

    fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err("Failed to read config file")?;
        serde_yaml::from_str(&content).wrap_err("Failed to parse config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.requesters, 10);
        assert_eq!(config.capacity, 5);
        assert_eq!(config.boarding_wait_secs, 8);
        assert_eq!(config.service_secs, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = Config {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositive { field: "capacity" }));

        let config = Config {
            requesters: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositive { field: "requesters" }));

        let config = Config {
            run_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositive { field: "run-secs" }));
    }

    #[test]
    fn test_capacity_limit() {
        let config = Config {
            capacity: MAX_CAPACITY + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::CapacityTooLarge { .. })));
    }

    #[test]
    fn test_inverted_explore_range() {
        let config = Config {
            explore_min_secs: 6,
            explore_max_secs: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedExploreRange { min: 6, max: 2 })
        );
    }

    #[test]
    fn test_timings() {
        let config = Config::default();
        assert_eq!(config.server_timing().boarding_wait, Duration::from_secs(8));
        assert_eq!(config.server_timing().service, Duration::from_secs(6));
        assert_eq!(config.requester_timing().ticket, Duration::from_secs(1));
        assert_eq!(config.run_duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "capacity: 3\nservers: 2\nboarding-wait-secs: 4\nseed: 42").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.capacity, 3);
        assert_eq!(config.servers, 2);
        assert_eq!(config.boarding_wait_secs, 4);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.requesters, 10);
    }

    #[test]
    fn test_search_paths_prefer_working_dir() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from("batchpark.yml"));
        assert!(paths.iter().skip(1).all(|p| p.ends_with("batchpark/batchpark.yml")));
    }

    #[test]
    fn test_load_malformed_explicit_file_names_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "capacity: [not, a, number]").unwrap();

        let err = Config::load(Some(&file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
        assert_eq!(Config::load_log_level(Some(&file.path().to_path_buf())), None);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/batchpark.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_log_level() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log-level: DEBUG").unwrap();
        assert_eq!(
            Config::load_log_level(Some(&file.path().to_path_buf())),
            Some("DEBUG".to_string())
        );
    }
}
