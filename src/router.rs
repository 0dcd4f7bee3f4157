//! Classify-and-route state machine.
//!
//! A file starts `Unprocessed`, becomes `Parsed` or `ParseFailed`, and ends
//! in exactly one of the terminal decisions below. Only the cash path touches
//! the database, and only `Inserted` leaves a row behind.

use rusqlite::Transaction;
use tracing::{debug, info};

use crate::db::{insert_result, is_constraint_violation};
use crate::dedup::{DuplicateDetector, DuplicateHit, Fingerprint};
use crate::error::Result;
use crate::models::{NonCashKind, Settlement, SummaryRecord};
use crate::parser::{parse_summary, ParseError};
use crate::session::{assign_session, Session};

/// Folder a decision sends the file to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Processed,
    NeedsReview,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewReason {
    Parse(ParseError),
    NonCash(NonCashKind),
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.reason(),
            Self::NonCash(kind) => kind.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    Inserted { row_id: i64, session: Option<Session> },
    NeedsReview(ReviewReason),
    Duplicate(DuplicateHit),
}

impl RoutingDecision {
    pub fn destination(&self) -> Destination {
        match self {
            Self::Inserted { .. } => Destination::Processed,
            Self::NeedsReview(_) => Destination::NeedsReview,
            Self::Duplicate(_) => Destination::Duplicate,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::NeedsReview(_) => "needs_review",
            Self::Duplicate(_) => "duplicate",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "ok",
            Self::NeedsReview(reason) => reason.as_str(),
            Self::Duplicate(hit) => hit.reason(),
        }
    }
}

/// Result of the parse transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Parsed(SummaryRecord),
    ParseFailed(ParseError),
}

impl Stage {
    pub fn parse(site: &str, hero_name: &str, text: &str) -> Self {
        match parse_summary(site, hero_name, text) {
            Ok(record) => Self::Parsed(record),
            Err(e) => Self::ParseFailed(e),
        }
    }

    pub fn record(&self) -> Option<&SummaryRecord> {
        match self {
            Self::Parsed(record) => Some(record),
            Self::ParseFailed(_) => None,
        }
    }
}

/// Per-run knobs the router needs.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub session_gap_minutes: i64,
}

/// The file being routed.
pub struct SourceFile<'a> {
    pub name: &'a str,
    pub fingerprint: &'a Fingerprint,
}

/// Decide where one file goes, inserting it when it is a new cash result.
///
/// The insert and any session index shifts run inside a savepoint of `tx`.
/// Nothing is committed here: the caller commits `tx` once the file has been
/// moved. `Err` means the database failed for a reason other than a
/// constraint violation.
pub fn route(
    tx: &mut Transaction<'_>,
    detector: &DuplicateDetector,
    policy: &RoutePolicy,
    source: &SourceFile<'_>,
    stage: &Stage,
) -> Result<RoutingDecision> {
    let record = match stage {
        Stage::ParseFailed(e) => {
            debug!(file = source.name, error = %e, "parse failed");
            return Ok(RoutingDecision::NeedsReview(ReviewReason::Parse(e.clone())));
        }
        Stage::Parsed(record) => record,
    };

    if let Settlement::NonCash(kind) = record.settlement {
        debug!(file = source.name, reason = kind.reason(), "non-cash result");
        return Ok(RoutingDecision::NeedsReview(ReviewReason::NonCash(kind)));
    }

    if let Some(hit) = detector.check(tx, source.fingerprint)? {
        debug!(file = source.name, reason = hit.reason(), "duplicate before insert");
        return Ok(RoutingDecision::Duplicate(hit));
    }

    let sp = tx.savepoint()?;
    let attempt = record
        .started_at
        .map(|ts| assign_session(&sp, &record.site, ts, policy.session_gap_minutes))
        .transpose()
        .and_then(|session| {
            insert_result(&sp, record, source.name, source.fingerprint, session.as_ref())
                .map(|row_id| (row_id, session))
        });

    match attempt {
        Ok((row_id, session)) => {
            sp.commit()?;
            info!(file = source.name, tournament = %record.tournament_id, row_id, "inserted");
            Ok(RoutingDecision::Inserted { row_id, session })
        }
        Err(e) if is_constraint_violation(&e) => {
            // dropping the savepoint rolls back the session shifts
            drop(sp);
            debug!(file = source.name, tournament = %record.tournament_id, "unique conflict");
            Ok(RoutingDecision::Duplicate(DuplicateHit::UniqueConflict))
        }
        Err(e) => Err(e.into()),
    }
}
