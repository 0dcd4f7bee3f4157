use std::collections::HashSet;
use std::fmt;

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 of a summary's normalized text, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize(text).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Line endings, trailing whitespace and a BOM do not change a summary.
fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateHit {
    /// Already inserted earlier in this run.
    SeenThisRun,
    /// A stored result carries the same source hash.
    HashExists,
    /// The insert hit a unique constraint.
    UniqueConflict,
}

impl DuplicateHit {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::SeenThisRun => "hash_seen",
            Self::HashExists => "hash_exists",
            Self::UniqueConflict => "unique_conflict",
        }
    }
}

/// Fingerprints committed during this run, backed by the database.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    seen: HashSet<Fingerprint>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, conn: &Connection, fingerprint: &Fingerprint) -> Result<Option<DuplicateHit>> {
        if self.seen.contains(fingerprint) {
            return Ok(Some(DuplicateHit::SeenThisRun));
        }
        let mut stmt =
            conn.prepare_cached("SELECT 1 FROM tournament_results WHERE source_file_hash = ?1 LIMIT 1")?;
        if stmt.exists([fingerprint.as_str()])? {
            return Ok(Some(DuplicateHit::HashExists));
        }
        Ok(None)
    }

    /// Only call once the insert carrying this fingerprint is committed.
    pub fn remember(&mut self, fingerprint: Fingerprint) {
        self.seen.insert(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of_text("Tournament #1, Buy-in $1, Payout $2");
        let b = Fingerprint::of_text("Tournament #1, Buy-in $1, Payout $2");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_line_endings_and_trailing_space() {
        let unix = Fingerprint::of_text("Tournament #1\nBuy-in: $1\n");
        let windows = Fingerprint::of_text("\u{feff}Tournament #1  \r\nBuy-in: $1\r\n\r\n");
        assert_eq!(unix, windows);
    }

    #[test]
    fn test_fingerprint_differs_on_content() {
        let a = Fingerprint::of_text("Tournament #1, Buy-in $1, Payout $2");
        let b = Fingerprint::of_text("Tournament #1, Buy-in $1, Payout $3");
        assert_ne!(a, b);
    }

    #[test]
    fn test_check_uses_session_set() {
        let (_dir, conn) = test_db();
        let mut detector = DuplicateDetector::new();
        let fp = Fingerprint::of_text("x");
        assert_eq!(detector.check(&conn, &fp).unwrap(), None);
        detector.remember(fp.clone());
        assert_eq!(detector.check(&conn, &fp).unwrap(), Some(DuplicateHit::SeenThisRun));
    }

    #[test]
    fn test_check_finds_stored_hash() {
        let (_dir, conn) = test_db();
        let fp = Fingerprint::of_text("stored");
        conn.execute(
            "INSERT INTO tournament_results (site, tournament_id, hero_name, source_file_name, \
             source_file_hash, currency, buy_in_amount, payout_amount, profit_amount) \
             VALUES ('GG', '1', 'Hero', 'a.txt', ?1, 'USD', 1.0, 0.0, -1.0)",
            [fp.as_str()],
        )
        .unwrap();
        let detector = DuplicateDetector::new();
        assert_eq!(detector.check(&conn, &fp).unwrap(), Some(DuplicateHit::HashExists));
        assert_eq!(
            detector.check(&conn, &Fingerprint::of_text("other")).unwrap(),
            None
        );
    }
}
