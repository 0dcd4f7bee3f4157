use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::models::TS_FORMAT;

/// Placement of one result inside a playing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub start: String,
    pub index: i64,
}

fn neighbour_within_gap(
    conn: &Connection,
    site: &str,
    ts: &str,
    bound: &str,
    before: bool,
) -> rusqlite::Result<Option<(String, String)>> {
    let sql = if before {
        "SELECT session_id, session_start FROM tournament_results
         WHERE site = ?1 AND session_id IS NOT NULL
           AND started_at <= ?2 AND started_at >= ?3
         ORDER BY started_at DESC LIMIT 1"
    } else {
        "SELECT session_id, session_start FROM tournament_results
         WHERE site = ?1 AND session_id IS NOT NULL
           AND started_at >= ?2 AND started_at <= ?3
         ORDER BY started_at ASC LIMIT 1"
    };
    conn.query_row(sql, rusqlite::params![site, ts, bound], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })
    .optional()
}

/// Bounds of the neighbour search. A gap too large for the calendar leaves
/// that side of the window open.
fn search_window(started_at: NaiveDateTime, gap_minutes: i64) -> (String, String) {
    let gap = TimeDelta::try_minutes(gap_minutes);
    let lower = gap
        .and_then(|g| started_at.checked_sub_signed(g))
        .map(|t| t.format(TS_FORMAT).to_string())
        .unwrap_or_default();
    let upper = gap
        .and_then(|g| started_at.checked_add_signed(g))
        .map(|t| t.format(TS_FORMAT).to_string())
        .unwrap_or_else(|| OPEN_UPPER.to_string());
    (lower, upper)
}

/// Sorts after every stored `TS_FORMAT` timestamp.
const OPEN_UPPER: &str = "9999-12-31 23:59:59";

/// Find or open the session for a result starting at `started_at`.
///
/// Joining an existing session shifts the index of every member that starts
/// at or after this result and pulls the session start back if needed. Run
/// this inside the same transaction as the insert so a failed insert undoes
/// the shifts.
pub fn assign_session(
    conn: &Connection,
    site: &str,
    started_at: NaiveDateTime,
    gap_minutes: i64,
) -> rusqlite::Result<Session> {
    let ts = started_at.format(TS_FORMAT).to_string();
    let (lower, upper) = search_window(started_at, gap_minutes);

    let existing = match neighbour_within_gap(conn, site, &ts, &lower, true)? {
        Some(found) => Some(found),
        None => neighbour_within_gap(conn, site, &ts, &upper, false)?,
    };

    let Some((session_id, session_start)) = existing else {
        let id = uuid::Uuid::new_v4().to_string();
        debug!(session = %id, start = %ts, "opening new session");
        return Ok(Session { id, start: ts, index: 1 });
    };

    let before: i64 = conn.query_row(
        "SELECT count(*) FROM tournament_results
         WHERE site = ?1 AND session_id = ?2 AND started_at < ?3",
        rusqlite::params![site, session_id, ts],
        |r| r.get(0),
    )?;

    let shifted = conn.execute(
        "UPDATE tournament_results
         SET session_index = session_index + 1,
             modified_at = datetime('now'),
             notes = CASE
                 WHEN notes IS NULL OR notes = '' THEN 'index_shifted'
                 ELSE notes || ' | index_shifted'
             END
         WHERE site = ?1 AND session_id = ?2 AND started_at >= ?3",
        rusqlite::params![site, session_id, ts],
    )?;

    let start = if ts < session_start {
        conn.execute(
            "UPDATE tournament_results SET session_start = ?1 WHERE site = ?2 AND session_id = ?3",
            rusqlite::params![ts, site, session_id],
        )?;
        ts
    } else {
        session_start
    };

    debug!(session = %session_id, index = before + 1, shifted, "joining session");
    Ok(Session {
        id: session_id,
        start,
        index: before + 1,
    })
}
