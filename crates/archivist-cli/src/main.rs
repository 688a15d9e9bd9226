//! Market Archivist CLI
//!
//! Command-line interface for the archive. Every command prints JSON to
//! stdout; errors go to stderr with a non-zero exit code.

use clap::{Parser, Subcommand};

mod commands;

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(name = "archivist")]
#[command(about = "Market Archivist - trade-day aware bar and annotation archive", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Init,
    /// Ingest a CSV export of bars
    Ingest(commands::ingest::IngestArgs),
    /// Save an annotation, optionally superseding an active one
    Annotate(commands::annotation::AnnotateArgs),
    /// Deprecate an active annotation
    Deprecate(commands::annotation::DeprecateArgs),
    /// List annotations for a symbol and date range
    Annotations(commands::annotation::ListArgs),
    /// Show the supersession chain of an annotation
    Lineage(commands::annotation::LineageArgs),
    /// Query stored bars
    Bars(commands::query::BarsArgs),
    /// Look up a trade-day anchor
    TradeDay(commands::query::TradeDayArgs),
    /// List recent ingestion runs
    Runs(commands::query::RunsArgs),
}

fn main() {
    let cli = Cli::parse();
    archivist_core::logging_facility::init(cli.global.log_format);

    let result = cli.global.load_config().and_then(|config| match cli.command {
        Commands::Init => commands::init::execute(&config),
        Commands::Ingest(args) => commands::ingest::execute(args, &config),
        Commands::Annotate(args) => commands::annotation::execute_save(args, &config),
        Commands::Deprecate(args) => commands::annotation::execute_deprecate(args, &config),
        Commands::Annotations(args) => commands::annotation::execute_list(args, &config),
        Commands::Lineage(args) => commands::annotation::execute_lineage(args, &config),
        Commands::Bars(args) => commands::query::execute_bars(args, &config),
        Commands::TradeDay(args) => commands::query::execute_trade_day(args, &config),
        Commands::Runs(args) => commands::query::execute_runs(args, &config),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
