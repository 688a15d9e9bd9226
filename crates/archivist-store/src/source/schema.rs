//! Per-source column mapping
//!
//! A `SourceSchema` names the CSV columns holding each bar field and how the
//! time column is written. Schemas are plain values passed into row
//! normalization; there is no global registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the built-in TradingView schema
pub const TRADINGVIEW: &str = "tradingview";

/// How the time column is written
///
/// Configured as `"epoch"`, `"iso8601"`, `"auto"` or `"pattern:<chrono format>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimestampFormat {
    /// Integer seconds since 1970-01-01T00:00:00 on the reference clock
    Epoch,
    /// RFC 3339, or ISO 8601 without an offset; the wall clock is kept as written
    Iso8601,
    /// Epoch if numeric, otherwise ISO 8601, otherwise `YYYY-MM-DD HH:MM:SS`
    Auto,
    /// A chrono `NaiveDateTime` format string
    Pattern(String),
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampFormat::Epoch => f.write_str("epoch"),
            TimestampFormat::Iso8601 => f.write_str("iso8601"),
            TimestampFormat::Auto => f.write_str("auto"),
            TimestampFormat::Pattern(p) => write!(f, "pattern:{}", p),
        }
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "epoch" => Ok(TimestampFormat::Epoch),
            "iso8601" => Ok(TimestampFormat::Iso8601),
            "auto" => Ok(TimestampFormat::Auto),
            other => match other.strip_prefix("pattern:") {
                Some(pattern) if !pattern.is_empty() => {
                    Ok(TimestampFormat::Pattern(pattern.to_string()))
                }
                _ => Err(format!(
                    "unknown timestamp format '{}' (expected epoch, iso8601, auto or pattern:<fmt>)",
                    other
                )),
            },
        }
    }
}

impl From<TimestampFormat> for String {
    fn from(value: TimestampFormat) -> Self {
        value.to_string()
    }
}

/// One or more accepted header names for a field
///
/// Matched case-insensitively, first match wins. Deserializes from either a
/// single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnNamesRepr", into = "Vec<String>")]
pub struct ColumnNames(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnNamesRepr {
    One(String),
    Any(Vec<String>),
}

impl From<ColumnNamesRepr> for ColumnNames {
    fn from(repr: ColumnNamesRepr) -> Self {
        match repr {
            ColumnNamesRepr::One(name) => ColumnNames(vec![name]),
            ColumnNamesRepr::Any(names) => ColumnNames(names),
        }
    }
}

impl From<ColumnNames> for Vec<String> {
    fn from(value: ColumnNames) -> Self {
        value.0
    }
}

impl ColumnNames {
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        ColumnNames(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ColumnNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

/// Column mapping for one data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub time_column: ColumnNames,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: TimestampFormat,
    pub open: ColumnNames,
    pub high: ColumnNames,
    pub low: ColumnNames,
    pub close: ColumnNames,
    /// Optional; rows without a volume cell store NULL
    #[serde(default)]
    pub volume: Option<ColumnNames>,
}

fn default_timestamp_format() -> TimestampFormat {
    TimestampFormat::Auto
}

impl SourceSchema {
    /// TradingView chart export: `time,open,high,low,close[,Volume]`
    pub fn tradingview() -> Self {
        Self {
            time_column: ColumnNames::new(["time"]),
            timestamp_format: TimestampFormat::Auto,
            open: ColumnNames::new(["open"]),
            high: ColumnNames::new(["high"]),
            low: ColumnNames::new(["low"]),
            close: ColumnNames::new(["close"]),
            volume: Some(ColumnNames::new(["volume", "Volume"])),
        }
    }

    /// Built-in schema for a source name, if any
    pub fn builtin(source: &str) -> Option<Self> {
        match source {
            TRADINGVIEW => Some(Self::tradingview()),
            _ => None,
        }
    }
}
