use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

struct Workspace {
    _dir: tempfile::TempDir,
    config: PathBuf,
    input: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("settings.json");
        let input = dir.path().join("summaries");
        let db = dir.path().join("stackbook.db");
        stackbook(&config)
            .args(["init", "--input-dir"])
            .arg(&input)
            .arg("--db")
            .arg(&db)
            .assert()
            .success()
            .stdout(predicate::str::contains("Input dir:"));
        Self { _dir: dir, config, input }
    }

    fn drop_in(&self, name: &str, text: &str) -> PathBuf {
        let path = self.input.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn import(&self) -> assert_cmd::assert::Assert {
        stackbook(&self.config).arg("import").assert()
    }

    fn log_lines(&self) -> Vec<serde_json::Value> {
        std::fs::read_to_string(self.input.join("logs").join("import_log.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

fn stackbook(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stackbook").unwrap();
    cmd.arg("--config").arg(config).env_remove("RUST_LOG");
    cmd
}

#[test]
fn init_creates_folders_and_settings() {
    let ws = Workspace::new();
    assert!(ws.config.exists());
    for folder in ["Processed", "Needs Review", "Duplicate", "logs"] {
        assert!(ws.input.join(folder).is_dir(), "missing {folder}");
    }
}

#[test]
fn cash_then_repeat_is_inserted_then_duplicate() {
    let ws = Workspace::new();
    ws.drop_in("t123.txt", "Tournament #123, Buy-in $10, Payout $25, Cash");
    ws.import()
        .success()
        .stdout(predicate::str::contains("Inserted: 1 | Duplicates: 0 | Needs Review: 0 | Errors: 0"));
    assert!(ws.input.join("Processed").join("t123.txt").exists());

    ws.drop_in("t123.txt", "Tournament #123, Buy-in $10, Payout $25, Cash");
    ws.import()
        .success()
        .stdout(predicate::str::contains("Inserted: 0 | Duplicates: 1 | Needs Review: 0 | Errors: 0"));
    assert!(ws.input.join("Duplicate").join("t123.txt").exists());

    let log = ws.log_lines();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["decision"], "inserted");
    assert_eq!(log[1]["decision"], "duplicate");
    assert_eq!(log[1]["reason"], "hash_exists");
}

#[test]
fn ticket_prize_needs_review() {
    let ws = Workspace::new();
    ws.drop_in("t124.txt", "Tournament #124, Ticket Prize");
    ws.import()
        .success()
        .stdout(predicate::str::contains("Needs Review: 1"));
    assert!(ws.input.join("Needs Review").join("t124.txt").exists());
    assert_eq!(ws.log_lines()[0]["reason"], "needs_review:ticket_prize");
}

#[test]
fn dry_run_leaves_files_in_place() {
    let ws = Workspace::new();
    let src = ws.drop_in("t123.txt", "Tournament #123, Buy-in $10, Payout $25, Cash");
    stackbook(&ws.config)
        .args(["import", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"));
    assert!(src.exists());
    assert_eq!(ws.log_lines()[0]["dry_run"], true);

    ws.import().success().stdout(predicate::str::contains("Inserted: 1"));
}

#[test]
fn status_reports_counts() {
    let ws = Workspace::new();
    ws.drop_in("t123.txt", "Tournament #123, Buy-in $10, Payout $25, Cash");
    stackbook(&ws.config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Waiting files:   1"));
    ws.import().success();
    stackbook(&ws.config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored results:  1"));
}

#[test]
fn missing_input_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(
        &config,
        format!(
            r#"{{"input_dir": "{}", "db_path": "{}"}}"#,
            dir.path().join("nowhere").display(),
            dir.path().join("x.db").display()
        ),
    )
    .unwrap();
    stackbook(&config)
        .arg("import")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input directory does not exist"));
}

#[test]
fn malformed_settings_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    std::fs::write(&config, "{oops").unwrap();
    stackbook(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Settings error"));
}
