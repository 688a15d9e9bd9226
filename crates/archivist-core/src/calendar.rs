//! Trade-day calendar resolution
//!
//! Maps a bar timestamp to exactly one of: a trade day, the daily halt, or
//! an invalid (closed-market) time.
//!
//! All times are in the single reference timezone. Timestamps are "local
//! epoch seconds": seconds since 1970-01-01T00:00:00 on the reference wall
//! clock. No zone arithmetic happens here or anywhere else.
//!
//! Weekly schedule:
//!
//! | Local time | Outcome |
//! |------------|---------|
//! | Saturday, any time | `Invalid(Saturday)` |
//! | Friday at or after 14:00 | `Invalid(PostClose)` |
//! | any other day, 14:00 to 14:59:59 | `Halted` |
//! | any other day, 15:00 onwards | next calendar date |
//! | before 14:00 (Sunday to Friday) | same calendar date |

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;

/// Start of the daily halt, and the Friday close
pub const HALT_START: NaiveTime = match NaiveTime::from_hms_opt(14, 0, 0) {
    Some(t) => t,
    None => panic!("invalid halt start"),
};

/// End of the daily halt; bars at or after this belong to the next date
pub const SESSION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(15, 0, 0) {
    Some(t) => t,
    None => panic!("invalid session open"),
};

/// Why a timestamp has no trade day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// Saturday data: always an upstream defect
    Saturday,
    /// Friday at or after the weekly close
    PostClose,
    /// Timestamp outside the representable date range
    OutOfRange,
}

impl InvalidReason {
    /// Soft reasons reject one row; the others abort the batch
    pub fn is_market_closed(&self) -> bool {
        matches!(self, InvalidReason::PostClose)
    }
}

/// Outcome of resolving one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum Resolution {
    TradeDay(NaiveDate),
    Halted,
    Invalid(InvalidReason),
}

impl Resolution {
    pub fn trade_day(&self) -> Option<NaiveDate> {
        match self {
            Resolution::TradeDay(date) => Some(*date),
            _ => None,
        }
    }
}

/// Resolve a local epoch-seconds timestamp
pub fn resolve(timestamp: i64) -> Resolution {
    match to_local(timestamp) {
        Some(dt) => resolve_local(dt),
        None => Resolution::Invalid(InvalidReason::OutOfRange),
    }
}

/// Resolve a wall-clock datetime in the reference timezone
pub fn resolve_local(dt: NaiveDateTime) -> Resolution {
    let date = dt.date();
    let time = dt.time();

    match date.weekday() {
        Weekday::Sat => Resolution::Invalid(InvalidReason::Saturday),
        Weekday::Fri if time >= HALT_START => Resolution::Invalid(InvalidReason::PostClose),
        _ if time < HALT_START => Resolution::TradeDay(date),
        _ if time < SESSION_OPEN => Resolution::Halted,
        _ => match date.succ_opt() {
            Some(next) => Resolution::TradeDay(next),
            None => Resolution::Invalid(InvalidReason::OutOfRange),
        },
    }
}

/// Whether a timestamp falls on a Saturday
pub fn is_saturday(timestamp: i64) -> bool {
    to_local(timestamp).is_some_and(|dt| dt.weekday() == Weekday::Sat)
}

/// Whether a timestamp falls inside the daily halt window
pub fn is_halt(timestamp: i64) -> bool {
    resolve(timestamp) == Resolution::Halted
}

/// Interpret local epoch seconds as a wall-clock datetime
pub fn to_local(timestamp: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.naive_utc())
}

/// Local epoch seconds of a wall-clock datetime
pub fn to_timestamp(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Local epoch seconds of a date's midnight
pub fn start_of_day(date: NaiveDate) -> i64 {
    to_timestamp(date.and_time(NaiveTime::MIN))
}
