//! Layered configuration
//!
//! Resolution order, later layers win:
//!
//! 1. Built-in defaults
//! 2. TOML file: the explicit `--config` path, else `archivist.toml` in the
//!    working directory when present
//! 3. `ARCHIVIST_DB` environment variable
//! 4. `--db` on the command line
//!
//! ```toml
//! db_path = "data/archive.db"
//! annotation_anchor_source = "tradingview"
//! default_source = "tradingview"
//!
//! [sources.ninjatrader]
//! time_column = "Date"
//! timestamp_format = "pattern:%Y%m%d %H%M%S"
//! open = "Open"
//! high = "High"
//! low = "Low"
//! close = "Close"
//! volume = ["Volume", "Vol"]
//! ```

#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use archivist_core::annotations::DEFAULT_ANCHOR_SOURCE;
use archivist_store::errors::{config_error, io_error, Result};
use archivist_store::source::TRADINGVIEW;
use archivist_store::SourceSchema;
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory
pub const CONFIG_FILE_NAME: &str = "archivist.toml";

/// Environment variable overriding the database path
pub const DB_ENV_VAR: &str = "ARCHIVIST_DB";

pub const DEFAULT_DB_PATH: &str = "archivist.db";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub db_path: PathBuf,
    /// Source recorded on anchors created by annotations
    pub annotation_anchor_source: String,
    /// Source used by `ingest` when none is given
    pub default_source: String,
    /// Column mappings by source name; these shadow built-in schemas
    pub sources: BTreeMap<String, SourceSchema>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            annotation_anchor_source: DEFAULT_ANCHOR_SOURCE.to_string(),
            default_source: TRADINGVIEW.to_string(),
            sources: BTreeMap::new(),
        }
    }
}

impl ArchiveConfig {
    /// Parse a TOML document on top of the defaults
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for invalid TOML, unknown keys or empty
    /// source names.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| config_error(format!("parse config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the file cannot be read, otherwise the
    /// errors of [`ArchiveConfig::from_toml`] tagged with the file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| io_error("read_config", e).with_file(&file))?;
        Self::from_toml(&content).map_err(|e| e.with_file(file))
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Fails when an explicit config file is missing or any file is invalid.
    pub fn load(config_path: Option<&Path>, cli_db: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                local.is_file().then_some(local)
            }
        };
        let env_db = std::env::var(DB_ENV_VAR).ok();
        Self::load_layered(file.as_deref(), env_db.as_deref(), cli_db)
    }

    /// Apply every layer from explicit inputs
    ///
    /// Empty override values are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveConfig::from_file`].
    pub fn load_layered(
        file: Option<&Path>,
        env_db: Option<&str>,
        cli_db: Option<&Path>,
    ) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(db) = env_db.filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(db);
        }
        if let Some(db) = cli_db.filter(|p| !p.as_os_str().is_empty()) {
            config.db_path = db.to_path_buf();
        }

        tracing::debug!(
            db_path = %config.db_path.display(),
            sources = config.sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Column mapping for a source: configured first, then built-in
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when neither exists.
    pub fn schema_for(&self, source: &str) -> Result<SourceSchema> {
        if let Some(schema) = self.sources.get(source) {
            return Ok(schema.clone());
        }
        SourceSchema::builtin(source).ok_or_else(|| {
            config_error(format!(
                "no column schema for source '{}'; add a [sources.{}] table",
                source, source
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.annotation_anchor_source.trim().is_empty() {
            return Err(config_error("annotation_anchor_source must not be empty"));
        }
        if self.default_source.trim().is_empty() {
            return Err(config_error("default_source must not be empty"));
        }
        if let Some(name) = self.sources.keys().find(|k| k.trim().is_empty()) {
            return Err(config_error(format!("invalid source name '{}'", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archivist_core::ExErrorKind;
    use archivist_store::source::TimestampFormat;

    #[test]
    fn test_defaults() {
        let config = ArchiveConfig::default();
        assert_eq!(config.db_path, PathBuf::from("archivist.db"));
        assert_eq!(config.annotation_anchor_source, "tradingview");
        assert_eq!(config.default_source, "tradingview");
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ArchiveConfig::from_toml("db_path = \"data/a.db\"").unwrap();
        assert_eq!(config.db_path, PathBuf::from("data/a.db"));
        assert_eq!(config.default_source, "tradingview");
    }

    #[test]
    fn test_source_table_parses() {
        let config = ArchiveConfig::from_toml(
            r#"
            [sources.ninjatrader]
            time_column = "Date"
            timestamp_format = "epoch"
            open = "Open"
            high = "High"
            low = "Low"
            close = "Close"
            "#,
        )
        .unwrap();

        let schema = config.schema_for("ninjatrader").unwrap();
        assert_eq!(schema.timestamp_format, TimestampFormat::Epoch);
        assert!(schema.volume.is_none());
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = ArchiveConfig::from_toml("db = \"x\"").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_empty_anchor_source_rejected() {
        let err = ArchiveConfig::from_toml("annotation_anchor_source = \" \"").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_schema_for_falls_back_to_builtin() {
        let config = ArchiveConfig::default();
        assert_eq!(
            config.schema_for("tradingview").unwrap(),
            SourceSchema::tradingview()
        );
        let err = config.schema_for("sierra").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Config);
    }

    #[test]
    fn test_overrides_apply_in_order() {
        let config = ArchiveConfig::load_layered(None, Some("env.db"), None).unwrap();
        assert_eq!(config.db_path, PathBuf::from("env.db"));

        let config =
            ArchiveConfig::load_layered(None, Some("env.db"), Some(Path::new("cli.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("cli.db"));

        let config = ArchiveConfig::load_layered(None, Some(""), None).unwrap();
        assert_eq!(config.db_path, PathBuf::from("archivist.db"));
    }
}
