use std::path::Path;

use rusqlite::{ffi, Connection, ErrorCode};

use crate::dedup::Fingerprint;
use crate::error::Result;
use crate::models::SummaryRecord;
use crate::session::Session;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tournament_results (
    id INTEGER PRIMARY KEY,
    site TEXT NOT NULL,
    tournament_id TEXT NOT NULL,
    started_at TEXT,
    hero_name TEXT NOT NULL,
    source_file_name TEXT NOT NULL,
    source_file_hash TEXT NOT NULL UNIQUE,
    tournament_name TEXT,
    game TEXT,
    player_count INTEGER,
    currency TEXT NOT NULL,
    buy_in_amount REAL NOT NULL,
    prize_pool_amount REAL,
    payout_amount REAL NOT NULL,
    profit_amount REAL NOT NULL,
    finish_place INTEGER,
    session_id TEXT,
    session_start TEXT,
    session_index INTEGER,
    imported_at TEXT DEFAULT (datetime('now')),
    modified_at TEXT,
    notes TEXT,
    UNIQUE (site, tournament_id)
);

CREATE INDEX IF NOT EXISTS idx_results_site_started
    ON tournament_results (site, started_at);
CREATE INDEX IF NOT EXISTS idx_results_session
    ON tournament_results (session_id);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open the database and make sure the schema exists.
pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = get_connection(db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
    )
}

/// Insert one cash result. Constraint violations come back as the raw
/// `rusqlite::Error` so the caller can tell duplicates from real failures.
pub fn insert_result(
    conn: &Connection,
    record: &SummaryRecord,
    source_file_name: &str,
    fingerprint: &Fingerprint,
    session: Option<&Session>,
) -> std::result::Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO tournament_results (
            site, tournament_id, started_at, hero_name,
            source_file_name, source_file_hash,
            tournament_name, game, player_count, currency,
            buy_in_amount, prize_pool_amount, payout_amount, profit_amount,
            finish_place, session_id, session_start, session_index
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        rusqlite::params![
            record.site,
            record.tournament_id,
            record.started_at_str(),
            record.hero_name,
            source_file_name,
            fingerprint.as_str(),
            record.tournament_name,
            record.game,
            record.player_count,
            record.currency,
            record.buy_in(),
            record.prize_pool,
            record.payout(),
            record.profit(),
            record.finish_place,
            session.map(|s| s.id.as_str()),
            session.map(|s| s.start.as_str()),
            session.map(|s| s.index),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn count_results(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM tournament_results", [], |r| r.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn insert_raw(conn: &Connection, tid: &str, hash: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO tournament_results (site, tournament_id, hero_name, source_file_name, \
             source_file_hash, currency, buy_in_amount, payout_amount, profit_amount) \
             VALUES ('GG', ?1, 'Hero', 'a.txt', ?2, 'USD', 1.0, 0.0, -1.0)",
            [tid, hash],
        )
    }

    #[test]
    fn test_init_db_creates_table() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(tables, vec!["tournament_results".to_string()]);
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stackbook.db");
        let conn = open(&path).unwrap();
        assert_eq!(count_results(&conn).unwrap(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_unique_tournament_per_site() {
        let (_dir, conn) = test_db();
        insert_raw(&conn, "1", "hash-a").unwrap();
        let err = insert_raw(&conn, "1", "hash-b").unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn test_unique_source_hash() {
        let (_dir, conn) = test_db();
        insert_raw(&conn, "1", "hash-a").unwrap();
        let err = insert_raw(&conn, "2", "hash-a").unwrap_err();
        assert!(is_constraint_violation(&err));
        assert_eq!(count_results(&conn).unwrap(), 1);
    }

    #[test]
    fn test_non_constraint_error_is_not_duplicate() {
        let (_dir, conn) = test_db();
        let err = conn.execute("INSERT INTO missing_table VALUES (1)", []).unwrap_err();
        assert!(!is_constraint_violation(&err));
    }

    #[test]
    fn test_not_null_violation_is_not_duplicate() {
        let (_dir, conn) = test_db();
        let err = conn
            .execute(
                "INSERT INTO tournament_results (site, tournament_id, hero_name, source_file_name, \
                 source_file_hash, currency, buy_in_amount, payout_amount, profit_amount) \
                 VALUES ('GG', '1', NULL, 'a.txt', 'hash-a', 'USD', 1.0, 0.0, -1.0)",
                [],
            )
            .unwrap_err();
        assert!(!is_constraint_violation(&err));
    }
}
