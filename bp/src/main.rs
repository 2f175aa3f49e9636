//! BatchPark - capacity-bounded batch rendezvous simulator
//!
//! CLI entry point: load config, run the simulation, print the final report.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use batchpark::cli::{Cli, OutputFormat};
use batchpark::config::Config;
use batchpark::delay::TokioDelay;
use batchpark::simulation::Simulation;
use batchpark::sink::{ConsoleSink, MemorySink, ReportSink};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout carries the report, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;
    debug!(?config, format = ?cli.format, "main: config resolved");

    // JSON output keeps stdout clean for the final document
    let sink: Arc<dyn ReportSink> = match cli.format {
        OutputFormat::Text => Arc::new(ConsoleSink::new(tokio::time::Instant::now())),
        OutputFormat::Json => Arc::new(MemorySink::new()),
    };

    let simulation = Simulation::new(config, Arc::new(TokioDelay), sink.clone());
    let outcome = simulation
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                // No signal handler; let the run duration decide
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Simulation failed")?;

    match cli.format {
        OutputFormat::Text => outcome.report.emit(sink.as_ref()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    Ok(())
}
