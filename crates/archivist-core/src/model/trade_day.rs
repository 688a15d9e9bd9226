//! Trade-day anchor model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row identifier of a trade-day anchor
pub type TradeDayId = i64;

/// A trade-day anchor
///
/// Unique per (symbol, session_date, source). Created lazily by the first bar
/// or annotation that resolves to it, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDay {
    pub id: TradeDayId,
    pub symbol: String,
    pub session_date: NaiveDate,
    pub source: String,
}

impl TradeDay {
    /// The uniqueness key of this anchor
    pub fn key(&self) -> TradeDayKey {
        TradeDayKey::new(&self.symbol, self.session_date, &self.source)
    }
}

/// Natural key of a trade-day anchor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeDayKey {
    pub symbol: String,
    pub session_date: NaiveDate,
    pub source: String,
}

impl TradeDayKey {
    pub fn new(symbol: &str, session_date: NaiveDate, source: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            session_date,
            source: source.to_string(),
        }
    }
}
