//! Report output sinks

use std::sync::Mutex;

use colored::*;
use tokio::time::Instant;

/// Receives formatted report lines
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Format an elapsed number of seconds as `HH:MM:SS`
pub fn format_hms(total_secs: u64) -> String {
    let hh = total_secs / 3600;
    let mm = (total_secs % 3600) / 60;
    let ss = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hh, mm, ss)
}

/// Writes each line to stdout, stamped with the time since the run started
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    started_at: Instant,
}

impl ConsoleSink {
    pub fn new(started_at: Instant) -> Self {
        Self { started_at }
    }
}

impl ReportSink for ConsoleSink {
    fn emit(&self, line: &str) {
        let stamp = format!("[Time: {}]", format_hms(self.started_at.elapsed().as_secs()));
        if line.starts_with("[Monitor]") {
            println!("{} {}", stamp.dimmed(), line.bold());
        } else {
            println!("{} {}", stamp.dimmed(), line);
        }
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}
