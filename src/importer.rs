use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::dedup::{DuplicateDetector, Fingerprint};
use crate::error::{Result, StackbookError};
use crate::folders::{move_with_suffix, relocate};
use crate::import_log::{self, LogEntry};
use crate::models::SummaryRecord;
use crate::parser::parse_summary;
use crate::router::{route, RoutePolicy, RoutingDecision, SourceFile, Stage};
use crate::settings::ImportConfig;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Summaries are UTF-8; anything else is decoded lossily.
pub fn read_summary(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(file = %path.display(), "not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Regular files directly inside the input directory with the configured
/// extension, sorted by name.
pub fn list_input_files(cfg: &ImportConfig) -> Result<Vec<PathBuf>> {
    if !cfg.input_dir.is_dir() {
        return Err(StackbookError::MissingInputDir(
            cfg.input_dir.display().to_string(),
        ));
    }
    let wanted = cfg.file_extension.trim_start_matches('.').to_lowercase();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&cfg.input_dir)? {
        let path = entry?.path();
        let matches_ext = path
            .extension()
            .is_some_and(|e| e.to_string_lossy().to_lowercase() == wanted);
        if path.is_file() && matches_ext {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Oldest start time first; files without one (or that fail to parse) last.
pub fn order_by_start(cfg: &ImportConfig, files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut keyed: Vec<(Option<NaiveDateTime>, PathBuf)> = files
        .into_iter()
        .map(|path| {
            let started_at = read_summary(&path)
                .ok()
                .and_then(|text| parse_summary(&cfg.site, &cfg.hero_name, &text).ok())
                .and_then(|record| record.started_at);
            (started_at, path)
        })
        .collect();
    keyed.sort_by(|(ta, pa), (tb, pb)| {
        ta.is_none()
            .cmp(&tb.is_none())
            .then(ta.cmp(tb))
            .then(pa.cmp(pb))
    });
    keyed.into_iter().map(|(_, path)| path).collect()
}

// ---------------------------------------------------------------------------
// Per-file processing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Routed(RoutingDecision),
    /// Left in place; the run moved on.
    Failed { kind: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    pub moved_to: Option<PathBuf>,
}

impl FileReport {
    pub fn label(&self) -> &'static str {
        match &self.outcome {
            FileOutcome::Routed(decision) => decision.label(),
            FileOutcome::Failed { .. } => "error",
        }
    }

    pub fn reason(&self) -> String {
        match &self.outcome {
            FileOutcome::Routed(decision) => decision.reason().to_string(),
            FileOutcome::Failed { kind, .. } => format!("fatal:{kind}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub needs_review: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

impl ImportSummary {
    fn record(&mut self, report: FileReport) {
        match &report.outcome {
            FileOutcome::Routed(RoutingDecision::Inserted { .. }) => self.inserted += 1,
            FileOutcome::Routed(RoutingDecision::Duplicate(_)) => self.duplicates += 1,
            FileOutcome::Routed(RoutingDecision::NeedsReview(_)) => self.needs_review += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
        self.files.push(report);
    }
}

/// Route one file inside a transaction, move it, then commit.
///
/// A failed move rolls the transaction back. A failed commit moves the file
/// back to where it was. Dry runs always roll back and never move.
fn route_and_move(
    conn: &mut Connection,
    detector: &mut DuplicateDetector,
    cfg: &ImportConfig,
    path: &Path,
    fingerprint: &Fingerprint,
    stage: &Stage,
) -> Result<(RoutingDecision, Option<PathBuf>)> {
    let name = file_name(path);
    let policy = RoutePolicy {
        session_gap_minutes: cfg.session_gap_minutes,
    };
    let source = SourceFile {
        name: &name,
        fingerprint,
    };

    let mut tx = conn.transaction()?;
    let decision = route(&mut tx, detector, &policy, &source, stage)?;
    let inserted = matches!(decision, RoutingDecision::Inserted { .. });

    if cfg.dry_run {
        drop(tx);
        if inserted {
            detector.remember(fingerprint.clone());
        }
        return Ok((decision, None));
    }

    let moved = move_with_suffix(path, cfg.folders.dir_for(decision.destination()))?;
    if let Err(e) = tx.commit() {
        if let Err(back) = relocate(&moved, path) {
            error!(file = %moved.display(), error = %back, "could not restore file after failed commit");
        }
        return Err(e.into());
    }
    if inserted {
        detector.remember(fingerprint.clone());
    }
    Ok((decision, Some(moved)))
}

fn log_entry(
    path: &Path,
    fingerprint: Option<&Fingerprint>,
    record: Option<&SummaryRecord>,
    report: &FileReport,
    dry_run: bool,
) -> LogEntry {
    LogEntry {
        filename: file_name(path),
        fingerprint: fingerprint.map(|f| f.to_string()),
        decision: report.label().to_string(),
        reason: report.reason(),
        tournament_id: record.map(|r| r.tournament_id.clone()),
        start_time: record.and_then(|r| r.started_at_str()),
        buy_in: record.and_then(|r| r.buy_in()),
        payout: record.and_then(|r| r.payout()),
        dry_run,
        timestamp: String::new(),
    }
}

fn process_file(
    conn: &mut Connection,
    detector: &mut DuplicateDetector,
    cfg: &ImportConfig,
    path: &Path,
) -> (FileReport, LogEntry) {
    let text = match read_summary(path) {
        Ok(text) => text,
        Err(e) => {
            error!(file = %path.display(), error = %e, "could not read summary");
            let report = FileReport {
                path: path.to_path_buf(),
                outcome: FileOutcome::Failed { kind: e.kind(), message: e.to_string() },
                moved_to: None,
            };
            let entry = log_entry(path, None, None, &report, cfg.dry_run);
            return (report, entry);
        }
    };

    let fingerprint = Fingerprint::of_text(&text);
    let stage = Stage::parse(&cfg.site, &cfg.hero_name, &text);

    let report = match route_and_move(conn, detector, cfg, path, &fingerprint, &stage) {
        Ok((decision, moved_to)) => FileReport {
            path: path.to_path_buf(),
            outcome: FileOutcome::Routed(decision),
            moved_to,
        },
        Err(e) => {
            error!(file = %path.display(), error = %e, "file left in place");
            FileReport {
                path: path.to_path_buf(),
                outcome: FileOutcome::Failed { kind: e.kind(), message: e.to_string() },
                moved_to: None,
            }
        }
    };
    let entry = log_entry(path, Some(&fingerprint), stage.record(), &report, cfg.dry_run);
    (report, entry)
}

// ---------------------------------------------------------------------------
// run_import
// ---------------------------------------------------------------------------

/// Process every summary in the input directory, one at a time.
pub fn run_import(conn: &mut Connection, cfg: &ImportConfig) -> Result<ImportSummary> {
    let files = list_input_files(cfg)?;
    cfg.folders.ensure_dirs()?;
    let files = order_by_start(cfg, files);
    info!(count = files.len(), dir = %cfg.input_dir.display(), dry_run = cfg.dry_run, "starting import");

    let mut detector = DuplicateDetector::new();
    let mut summary = ImportSummary::default();

    for path in files {
        let (report, entry) = process_file(conn, &mut detector, cfg, &path);
        info!(file = %entry.filename, decision = %entry.decision, reason = %entry.reason, "routed");
        if let Err(e) = import_log::append(&cfg.folders.log_path, &entry) {
            warn!(file = %entry.filename, error = %e, "could not write import log");
        }
        summary.record(report);
    }

    Ok(summary)
}
