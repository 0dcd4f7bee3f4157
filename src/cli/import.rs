use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db;
use crate::error::Result;
use crate::importer::{run_import, FileOutcome, ImportSummary};
use crate::router::RoutingDecision;
use crate::settings::{load_settings, shellexpand_path, ImportConfig};

fn decision_cell(outcome: &FileOutcome, label: &str) -> Cell {
    let text = match outcome {
        FileOutcome::Routed(RoutingDecision::Inserted { .. }) => label.green(),
        FileOutcome::Routed(RoutingDecision::Duplicate(_)) => label.yellow(),
        FileOutcome::Routed(RoutingDecision::NeedsReview(_)) => label.cyan(),
        FileOutcome::Failed { .. } => label.red().bold(),
    };
    Cell::new(text)
}

fn print_summary(summary: &ImportSummary, dry_run: bool) {
    if summary.files.is_empty() {
        println!("No summary files found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Decision", "Detail", "Moved to"]);
    for report in &summary.files {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let reason = match &report.outcome {
            FileOutcome::Failed { message, .. } => format!("{} ({message})", report.reason()),
            FileOutcome::Routed(RoutingDecision::Inserted {
                row_id,
                session: Some(session),
            }) => format!("row {row_id}, session #{}", session.index),
            FileOutcome::Routed(RoutingDecision::Inserted { row_id, session: None }) => {
                format!("row {row_id}")
            }
            FileOutcome::Routed(_) => report.reason(),
        };
        let moved_to = report
            .moved_to
            .as_ref()
            .and_then(|p| p.parent())
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(name),
            decision_cell(&report.outcome, report.label()),
            Cell::new(reason),
            Cell::new(moved_to),
        ]);
    }
    println!("{table}");

    if dry_run {
        println!("{}", "Dry run: nothing was stored or moved.".bold());
    }
    println!(
        "Inserted: {} | Duplicates: {} | Needs Review: {} | Errors: {}",
        summary.inserted, summary.duplicates, summary.needs_review, summary.failed
    );
}

pub fn run(config_path: &Path, input_dir: Option<String>, dry_run: bool) -> Result<()> {
    let mut settings = load_settings(config_path)?;
    if let Some(dir) = input_dir {
        settings.input_dir = shellexpand_path(&dir);
    }
    settings.dry_run |= dry_run;

    let cfg = ImportConfig::from_settings(&settings)?;
    let mut conn = db::open(&cfg.db_path)?;
    let summary = run_import(&mut conn, &cfg)?;
    print_summary(&summary, cfg.dry_run);
    Ok(())
}
