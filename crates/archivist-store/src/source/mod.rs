//! Row sources: schema-driven CSV normalization

pub mod csv_reader;
pub mod schema;

pub use csv_reader::{parse_timestamp, read_rows, read_rows_from};
pub use schema::{ColumnNames, SourceSchema, TimestampFormat, TRADINGVIEW};
