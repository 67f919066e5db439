use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::demand::PanelSummary;

const HEADER: [&str; 9] = [
    "timestamp",
    "input",
    "output",
    "records",
    "skipped",
    "bidders",
    "rounds",
    "widest_catalog",
    "status",
];

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub finished_at: DateTime<Utc>,
    pub input: String,
    pub output: String,
    pub records: usize,
    pub skipped: usize,
    pub summary: PanelSummary,
    pub saved: bool,
}

impl RunRecord {
    fn status(&self) -> &'static str {
        if self.saved {
            "saved"
        } else {
            "failed"
        }
    }
}

/// Appends one CSV line per run.
pub struct RunLogger {
    log_path: PathBuf,
}

impl RunLogger {
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();

        // Create CSV file with headers if it doesn't exist
        if !log_path.exists() {
            if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }

            let mut writer = csv::Writer::from_path(&log_path)
                .with_context(|| format!("Failed to create run log {}", log_path.display()))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self { log_path })
    }

    pub fn log_run(&self, run: &RunRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open run log {}", self.log_path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        writer.write_record([
            run.finished_at.to_rfc3339(),
            run.input.clone(),
            run.output.clone(),
            run.records.to_string(),
            run.skipped.to_string(),
            run.summary.bidders.to_string(),
            run.summary.rounds.to_string(),
            run.summary.widest_catalog.to_string(),
            run.status().to_string(),
        ])?;
        writer.flush()?;

        Ok(())
    }
}
