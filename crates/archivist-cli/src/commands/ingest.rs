//! Ingest command
//!
//! Usage: archivist ingest <FILE> --symbol <SYMBOL> [--timeframe 1m] [--source <NAME>]
//!
//! Conflicts and rejected rows are reported in the JSON summary and do not
//! fail the command. A Saturday row or a malformed file does.

use std::path::PathBuf;

use archivist_engine::commands::database::database_open;
use archivist_engine::commands::ingest::ingest_file;
use archivist_engine::ArchiveConfig;
use clap::Args;

use super::print_json;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// CSV file to ingest
    pub file: PathBuf,

    #[arg(long)]
    pub symbol: String,

    #[arg(long, default_value = "1m")]
    pub timeframe: String,

    /// Data source name (default: `default_source` from config)
    #[arg(long)]
    pub source: Option<String>,
}

pub fn execute(args: IngestArgs, config: &ArchiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = args.source.unwrap_or_else(|| config.default_source.clone());
    let schema = config.schema_for(&source)?;
    let conn = database_open(&config.db_path)?;

    let outcome = ingest_file(
        &args.file,
        &args.symbol,
        &args.timeframe,
        &source,
        &schema,
        &conn,
    )?;
    print_json(&outcome)
}
