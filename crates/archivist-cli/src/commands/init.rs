//! Init command
//!
//! Usage: archivist init [--db <PATH>]

use archivist_engine::commands::database::database_init;
use archivist_engine::ArchiveConfig;

use super::print_json;

pub fn execute(config: &ArchiveConfig) -> Result<(), Box<dyn std::error::Error>> {
    let status = database_init(&config.db_path)?;
    print_json(&status)
}
