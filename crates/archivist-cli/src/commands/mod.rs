//! Subcommand implementations

pub mod annotation;
pub mod ingest;
pub mod init;
pub mod query;

use std::path::PathBuf;

use archivist_core::logging_facility::Profile;
use archivist_engine::ArchiveConfig;
use clap::Args;
use serde::Serialize;

/// Flags accepted by every subcommand
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Database path (overrides config file and ARCHIVIST_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (default: ./archivist.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output: pretty or json
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: Profile,
}

impl GlobalArgs {
    pub fn load_config(&self) -> Result<ArchiveConfig, Box<dyn std::error::Error>> {
        Ok(ArchiveConfig::load(
            self.config.as_deref(),
            self.db.as_deref(),
        )?)
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
