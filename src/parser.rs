use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use thiserror::Error;

use crate::models::{round_cents, NonCashKind, Settlement, SummaryRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing `Tournament #<id>` header")]
    MissingHeader,

    #[error("missing buy-in line")]
    MissingBuyIn,

    #[error("no payout line for {0}")]
    MissingHeroPayout(String),

    #[error("unreadable start time: {0}")]
    BadStartTime(String),
}

impl ParseError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "parse_error:missing_tournament_header",
            Self::MissingBuyIn => "parse_error:missing_buy_in",
            Self::MissingHeroPayout(_) => "parse_error:missing_hero_payout_line",
            Self::BadStartTime(_) => "parse_error:bad_start_time",
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

struct Patterns {
    header: Regex,
    buy_in: Regex,
    payout: Regex,
    placement: Regex,
    players: Regex,
    prize_pool: Regex,
    started: Regex,
    finished: Regex,
    amount: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        header: compile(r"(?i)^Tournament\s*#\s*(\d+)\s*(.*)$"),
        buy_in: compile(r"(?i)^Buy-?in\s*:?\s*(.+)$"),
        payout: compile(r"(?i)^Payout\s*:?\s*(.+)$"),
        placement: compile(r"(?i)^(\d+)(?:st|nd|rd|th)?\s*:\s*(.+?)\s*,\s*(.+)$"),
        players: compile(r"(?i)^(\d+)\s+Players$"),
        prize_pool: compile(r"(?i)^Total\s+Prize\s+Pool\s*:\s*(.+)$"),
        started: compile(r"(?i)^Tournament\s+started\s+(.+)$"),
        finished: compile(
            r"(?i)^You\s+finished\s+(?:the\s+tournament\s+)?in\s+(\d+)(?:st|nd|rd|th)?\s+place\.?$",
        ),
        amount: compile(r"^\d+(?:\.\d+)?$"),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a dollar token: "$3", "$3.00", "$1,200.50". Anything else is not cash.
pub fn parse_money_usd(token: &str) -> Option<f64> {
    let rest = token.trim().strip_prefix('$')?;
    let digits = rest.replace(',', "");
    let digits = digits.trim();
    if !patterns().amount.is_match(digits) {
        return None;
    }
    digits.parse::<f64>().ok().map(round_cents)
}

/// Buy-ins may be split into components ("$2.85+$0.30"); every part must be cash.
fn parse_buy_in(token: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in token.split('+') {
        total += parse_money_usd(part)?;
    }
    Some(round_cents(total))
}

fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let head: String = raw.split_whitespace().take(2).collect::<Vec<_>>().join(" ");
    for candidate in [raw, head.as_str()] {
        for fmt in ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(ts) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(ts);
            }
        }
    }
    None
}

fn is_non_cash_marker(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    lower.contains("ticket") || lower.contains("bonus") || segment.contains("T$")
}

/// Split header segments on commas, except thousands separators ("$1,000").
fn split_segments(rest: &str) -> Vec<&str> {
    let bytes = rest.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        let between_digits = i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if *b == b',' && !between_digits {
            segments.push(rest[start..i].trim());
            start = i + 1;
        }
    }
    segments.push(rest[start..].trim());
    segments.retain(|s| !s.is_empty());
    segments
}

fn capture_u32(caps: &Captures, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

// ---------------------------------------------------------------------------
// Field collection
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Fields {
    tournament_name: Option<String>,
    game: Option<String>,
    buy_in: Option<String>,
    payout: Option<String>,
    hero_place: Option<u32>,
    finish_place: Option<u32>,
    player_count: Option<u32>,
    prize_pool: Option<f64>,
    started_raw: Option<String>,
    non_cash_marker: bool,
}

impl Fields {
    fn absorb_header_segment(&mut self, segment: &str) {
        let p = patterns();
        if let Some(caps) = p.buy_in.captures(segment) {
            self.buy_in.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = p.payout.captures(segment) {
            self.payout.get_or_insert_with(|| caps[1].trim().to_string());
        } else if segment.eq_ignore_ascii_case("cash") {
            // explicit marker; cash is inferred from the amounts anyway
        } else {
            if is_non_cash_marker(segment) {
                self.non_cash_marker = true;
            }
            if self.tournament_name.is_none() {
                self.tournament_name = Some(segment.to_string());
            } else if self.game.is_none() {
                self.game = Some(segment.to_string());
            }
        }
    }

    fn absorb_line(&mut self, line: &str, hero_name: &str) {
        let p = patterns();
        if let Some(caps) = p.buy_in.captures(line) {
            self.buy_in.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = p.prize_pool.captures(line) {
            self.prize_pool = self.prize_pool.or_else(|| parse_money_usd(&caps[1]));
        } else if let Some(caps) = p.started.captures(line) {
            self.started_raw.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = p.finished.captures(line) {
            self.finish_place = self.finish_place.or_else(|| capture_u32(&caps, 1));
        } else if let Some(caps) = p.players.captures(line) {
            self.player_count = self.player_count.or_else(|| capture_u32(&caps, 1));
        } else if let Some(caps) = p.payout.captures(line) {
            self.payout.get_or_insert_with(|| caps[1].trim().to_string());
        } else if let Some(caps) = p.placement.captures(line) {
            if self.hero_place.is_none() && caps[2].trim().eq_ignore_ascii_case(hero_name) {
                self.hero_place = capture_u32(&caps, 1);
                self.payout = Some(caps[3].trim().to_string());
            }
        }
    }

    fn settle(&self, hero_name: &str) -> Result<Settlement, ParseError> {
        let buy_in = match &self.buy_in {
            Some(token) => match parse_buy_in(token) {
                Some(amount) => Some(amount),
                None => return Ok(Settlement::NonCash(NonCashKind::BuyIn)),
            },
            None => None,
        };

        let payout = match &self.payout {
            Some(token) => match parse_money_usd(token) {
                Some(amount) => Some(amount),
                None => return Ok(Settlement::NonCash(NonCashKind::Payout)),
            },
            None if self.non_cash_marker => {
                return Ok(Settlement::NonCash(NonCashKind::TicketPrize))
            }
            None => None,
        };

        let buy_in = buy_in.ok_or(ParseError::MissingBuyIn)?;
        let payout = match payout {
            Some(amount) => amount,
            // Busted outside the paid places: the summary only lists a finish.
            None if self.finish_place.is_some() => 0.0,
            None => return Err(ParseError::MissingHeroPayout(hero_name.to_string())),
        };
        Ok(Settlement::Cash { buy_in, payout })
    }
}

// ---------------------------------------------------------------------------
// parse_summary
// ---------------------------------------------------------------------------

/// `#0042` and `#42` name the same tournament.
fn canonical_id(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0" } else { trimmed }.to_string()
}

/// Parse one tournament summary. Pure: no IO, no clock.
pub fn parse_summary(site: &str, hero_name: &str, text: &str) -> Result<SummaryRecord, ParseError> {
    let p = patterns();
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let (header_idx, caps) = lines
        .iter()
        .enumerate()
        .find_map(|(i, line)| p.header.captures(line).map(|c| (i, c)))
        .ok_or(ParseError::MissingHeader)?;
    let tournament_id = canonical_id(&caps[1]);

    let mut fields = Fields::default();
    for segment in split_segments(&caps[2]) {
        fields.absorb_header_segment(segment);
    }
    for (i, line) in lines.iter().enumerate() {
        if i != header_idx && !line.is_empty() {
            fields.absorb_line(line, hero_name);
        }
    }

    let settlement = fields.settle(hero_name)?;

    let started_at = match &fields.started_raw {
        Some(raw) => Some(parse_start_time(raw).ok_or_else(|| ParseError::BadStartTime(raw.clone()))?),
        None => None,
    };

    Ok(SummaryRecord {
        site: site.to_string(),
        tournament_id,
        hero_name: hero_name.to_string(),
        tournament_name: fields.tournament_name,
        game: fields.game,
        player_count: fields.player_count,
        currency: "USD".to_string(),
        prize_pool: fields.prize_pool,
        finish_place: fields.finish_place.or(fields.hero_place),
        started_at,
        settlement,
    })
}
