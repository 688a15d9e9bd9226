//! Bar model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trade_day::TradeDayId;

/// Row identifier of a stored bar
pub type BarId = i64;

/// Price and volume fields of one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Ohlcv {
    /// Bit-for-bit equality of every field, volume null-ness included
    ///
    /// Unlike `==`, `NaN` equals itself and `0.0` differs from `-0.0`.
    pub fn bit_eq(&self, other: &Ohlcv) -> bool {
        self.open.to_bits() == other.open.to_bits()
            && self.high.to_bits() == other.high.to_bits()
            && self.low.to_bits() == other.low.to_bits()
            && self.close.to_bits() == other.close.to_bits()
            && match (self.volume, other.volume) {
                (Some(a), Some(b)) => a.to_bits() == b.to_bits(),
                (None, None) => true,
                _ => false,
            }
    }
}

/// Deduplication bucket of a bar
///
/// Resolved bars are unique per (trade day, timestamp). Halted bars have no
/// trade day and are unique per (symbol, source, timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BarBucket {
    TradeDay { trade_day_id: TradeDayId },
    Halt { symbol: String, source: String },
}

impl BarBucket {
    pub fn is_halt(&self) -> bool {
        matches!(self, BarBucket::Halt { .. })
    }
}

/// A bar ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewBar {
    /// `None` for bars inside the daily halt window
    pub trade_day_id: Option<TradeDayId>,
    pub symbol: String,
    pub source: String,
    pub timeframe: String,
    pub timestamp: i64,
    pub ohlcv: Ohlcv,
    /// Source payload, stored verbatim
    pub raw: Option<String>,
}

impl NewBar {
    pub fn halted(&self) -> bool {
        self.trade_day_id.is_none()
    }

    pub fn bucket(&self) -> BarBucket {
        match self.trade_day_id {
            Some(trade_day_id) => BarBucket::TradeDay { trade_day_id },
            None => BarBucket::Halt {
                symbol: self.symbol.clone(),
                source: self.source.clone(),
            },
        }
    }
}

/// A stored bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub id: BarId,
    pub trade_day_id: Option<TradeDayId>,
    /// Session date of the owning anchor; `None` for halted bars
    pub session_date: Option<NaiveDate>,
    pub symbol: String,
    pub source: String,
    pub timeframe: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub ohlcv: Ohlcv,
    pub halted: bool,
    pub raw: Option<String>,
}

impl Bar {
    pub fn bucket(&self) -> BarBucket {
        match self.trade_day_id {
            Some(trade_day_id) => BarBucket::TradeDay { trade_day_id },
            None => BarBucket::Halt {
                symbol: self.symbol.clone(),
                source: self.source.clone(),
            },
        }
    }
}

/// Bar read filter
///
/// Dates are inclusive. Halted bars are excluded unless `include_halt` is
/// set, and are then matched by the calendar date of their timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarFilter {
    pub symbol: String,
    pub source: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub include_halt: bool,
}

impl BarFilter {
    /// All non-halted bars for one symbol and source
    pub fn new(symbol: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source: source.into(),
            start: None,
            end: None,
            include_halt: false,
        }
    }

    /// Restrict to a single session date
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.start = Some(date);
        self.end = Some(date);
        self
    }

    /// Restrict to an inclusive session date range
    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_halt(mut self, include_halt: bool) -> Self {
        self.include_halt = include_halt;
        self
    }

    /// Whether a session date falls inside the filter's range
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}
