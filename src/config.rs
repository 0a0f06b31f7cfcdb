//! Configuration management for the tidewater service.
//!
//! Configuration is loaded from multiple sources, later sources overriding earlier ones:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/tidewater/config.toml`)
//! 3. User-specified configuration file
//! 4. Environment variables (prefixed with `TIDEWATER_`, `__` between section and key)
//! 5. Command-line arguments

use crate::error::{Error, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Command-line overrides for the configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage engine type
    #[arg(long, global = true)]
    pub engine: Option<String>,

    /// Storage engine connection string: a DuckDB file path (default tidewater.duckdb) or :memory:
    #[arg(long, global = true)]
    pub engine_connection: Option<String>,

    /// Storage engine options (key=value)
    #[arg(long = "engine-option", global = true)]
    pub engine_options: Vec<String>,

    /// Page size used when a request names none
    #[arg(long, global = true)]
    pub default_page_size: Option<u32>,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Storage configuration
    pub storage: StorageConfig,
    /// Paging limits
    #[serde(default)]
    pub paging: PagingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage engine type
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Connection string
    #[serde(default = "default_connection")]
    pub connection: String,
    /// Engine-specific options
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            connection: default_connection(),
            options: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Upper bound on any requested page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_page_size")]
    pub catalog_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            catalog_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from all sources
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name("/etc/tidewater/config.toml").required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TIDEWATER")
                .prefix_separator("_")
                .separator("__"),
        );

        let mut config: ServiceConfig = builder.build()?.try_deserialize()?;

        // Override with command line args
        if let Some(engine) = &args.engine {
            config.storage.engine = engine.clone();
        }
        if let Some(connection) = &args.engine_connection {
            config.storage.connection = connection.clone();
        }
        for opt in &args.engine_options {
            let (key, value) = opt.split_once('=').ok_or_else(|| {
                Error::Config(format!("engine option '{}' is not key=value", opt))
            })?;
            config.storage.options.insert(key.to_string(), value.to_string());
        }
        if let Some(size) = args.default_page_size {
            config.paging.default_page_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.paging.default_page_size > self.paging.max_page_size {
            return Err(Error::Config(format!(
                "default_page_size {} exceeds max_page_size {}",
                self.paging.default_page_size, self.paging.max_page_size
            )));
        }
        Ok(())
    }
}

fn default_engine() -> String {
    "duckdb".to_string()
}

fn default_connection() -> String {
    "tidewater.duckdb".to_string()
}

fn default_page_size() -> u32 {
    500
}

fn default_max_page_size() -> u32 {
    50_000
}

fn default_log_filter() -> String {
    "tidewater_core=info,tidewater=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ServiceConfig::load(&ConfigArgs::default()).unwrap();
        assert_eq!(config.storage.engine, "duckdb");
        // a file archive, so data written by one run is read by the next
        assert_eq!(config.storage.connection, "tidewater.duckdb");
        assert_eq!(StorageConfig::default().connection, config.storage.connection);
        assert_eq!(config.paging.max_page_size, 50_000);
        assert_eq!(config.paging.catalog_page_size, 500);
    }

    #[test]
    fn test_cli_overrides() {
        let args = ConfigArgs {
            engine_connection: Some("/tmp/archive.duckdb".into()),
            engine_options: vec!["threads=2".into()],
            default_page_size: Some(25),
            ..Default::default()
        };
        let config = ServiceConfig::load(&args).unwrap();
        assert_eq!(config.storage.connection, "/tmp/archive.duckdb");
        assert_eq!(config.storage.options.get("threads").map(String::as_str), Some("2"));
        assert_eq!(config.paging.default_page_size, 25);
    }

    #[test]
    fn test_bad_engine_option() {
        let args = ConfigArgs {
            engine_options: vec!["threads".into()],
            ..Default::default()
        };
        assert!(matches!(ServiceConfig::load(&args), Err(Error::Config(_))));
    }

    #[test]
    fn test_page_size_bounds_checked() {
        let args = ConfigArgs {
            default_page_size: Some(1_000_000),
            ..Default::default()
        };
        assert!(matches!(ServiceConfig::load(&args), Err(Error::Config(_))));
    }
}
