//! Read commands: bars, trade-day, runs

use archivist_core::model::BarFilter;
use archivist_engine::commands::database::database_open;
use archivist_engine::commands::read_tools::{
    bars_query, runs_list, trade_day_get, DEFAULT_LIST_LIMIT,
};
use archivist_engine::ArchiveConfig;
use chrono::NaiveDate;
use clap::Args;

use super::print_json;

#[derive(Debug, Args)]
pub struct BarsArgs {
    #[arg(long)]
    pub symbol: String,

    /// Data source name (default: `default_source` from config)
    #[arg(long)]
    pub source: Option<String>,

    /// Single session date (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Also return bars stored in the daily halt window
    #[arg(long)]
    pub include_halt: bool,
}

#[derive(Debug, Args)]
pub struct TradeDayArgs {
    #[arg(long)]
    pub symbol: String,

    /// Session date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunsArgs {
    #[arg(long)]
    pub symbol: Option<String>,

    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,
}

pub fn execute_bars(args: BarsArgs, config: &ArchiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = args.source.unwrap_or_else(|| config.default_source.clone());
    let mut filter = BarFilter::new(args.symbol, source).with_halt(args.include_halt);
    match args.date {
        Some(date) => filter = filter.on(date),
        None => {
            // Either bound may be open
            filter.start = args.start;
            filter.end = args.end;
        }
    }

    let conn = database_open(&config.db_path)?;
    let bars = bars_query(&filter, &conn)?;
    print_json(&bars)
}

pub fn execute_trade_day(
    args: TradeDayArgs,
    config: &ArchiveConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = args.source.unwrap_or_else(|| config.default_source.clone());
    let conn = database_open(&config.db_path)?;
    match trade_day_get(&args.symbol, args.date, &source, &conn)? {
        Some(trade_day) => print_json(&trade_day),
        None => Err(format!(
            "no trade day for {} on {} from {}",
            args.symbol, args.date, source
        )
        .into()),
    }
}

pub fn execute_runs(args: RunsArgs, config: &ArchiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let conn = database_open(&config.db_path)?;
    let runs = runs_list(args.symbol.as_deref(), args.limit, &conn)?;
    print_json(&runs)
}
