use chrono::NaiveDateTime;

/// Timestamp layout used for storage, logs and ordering.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a non-monetary value showed up in a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonCashKind {
    BuyIn,
    Payout,
    TicketPrize,
}

impl NonCashKind {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BuyIn => "needs_review:non_cash_buy_in",
            Self::Payout => "needs_review:non_cash_payout",
            Self::TicketPrize => "needs_review:ticket_prize",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Cash { buy_in: f64, payout: f64 },
    NonCash(NonCashKind),
}

/// One tournament result extracted from a summary file.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub site: String,
    pub tournament_id: String,
    pub hero_name: String,
    pub tournament_name: Option<String>,
    pub game: Option<String>,
    pub player_count: Option<u32>,
    pub currency: String,
    pub prize_pool: Option<f64>,
    pub finish_place: Option<u32>,
    pub started_at: Option<NaiveDateTime>,
    pub settlement: Settlement,
}

impl SummaryRecord {
    pub fn is_cash(&self) -> bool {
        matches!(self.settlement, Settlement::Cash { .. })
    }

    pub fn buy_in(&self) -> Option<f64> {
        match self.settlement {
            Settlement::Cash { buy_in, .. } => Some(buy_in),
            Settlement::NonCash(_) => None,
        }
    }

    pub fn payout(&self) -> Option<f64> {
        match self.settlement {
            Settlement::Cash { payout, .. } => Some(payout),
            Settlement::NonCash(_) => None,
        }
    }

    pub fn profit(&self) -> Option<f64> {
        match self.settlement {
            Settlement::Cash { buy_in, payout } => Some(round_cents(payout - buy_in)),
            Settlement::NonCash(_) => None,
        }
    }

    pub fn started_at_str(&self) -> Option<String> {
        self.started_at.map(|ts| ts.format(TS_FORMAT).to_string())
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(settlement: Settlement) -> SummaryRecord {
        SummaryRecord {
            site: "GG".to_string(),
            tournament_id: "1".to_string(),
            hero_name: "Hero".to_string(),
            tournament_name: None,
            game: None,
            player_count: None,
            currency: "USD".to_string(),
            prize_pool: None,
            finish_place: None,
            started_at: None,
            settlement,
        }
    }

    #[test]
    fn test_profit_is_rounded_to_cents() {
        let r = record(Settlement::Cash { buy_in: 3.3, payout: 10.1 });
        assert_eq!(r.profit(), Some(6.8));
        assert!(r.is_cash());
    }

    #[test]
    fn test_non_cash_has_no_amounts() {
        let r = record(Settlement::NonCash(NonCashKind::TicketPrize));
        assert!(!r.is_cash());
        assert_eq!(r.buy_in(), None);
        assert_eq!(r.payout(), None);
        assert_eq!(r.profit(), None);
    }
}
