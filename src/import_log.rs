use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One line of `import_log.jsonl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub filename: String,
    pub fingerprint: Option<String>,
    /// inserted / needs_review / duplicate / error
    pub decision: String,
    pub reason: String,
    pub tournament_id: Option<String>,
    pub start_time: Option<String>,
    pub buy_in: Option<f64>,
    pub payout: Option<f64>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub timestamp: String,
}

/// Stamp `entry` with the local time and append it as one JSON line.
pub fn append(log_path: &Path, entry: &LogEntry) -> Result<()> {
    let mut entry = entry.clone();
    entry.timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(&entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
pub fn read_entries(log_path: &Path) -> Result<Vec<LogEntry>> {
    let content = std::fs::read_to_string(log_path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(Into::into))
        .collect()
}
