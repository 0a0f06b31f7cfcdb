//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Trace and catalog retrieval
//! - Loading and deleting values
//! - Configuration handling

pub mod commands;
pub mod handlers;

use crate::config::ConfigArgs;
use clap::Parser;

pub use commands::Commands;
pub use handlers::{handle_catalog, handle_config, handle_delete, handle_store, handle_timeseries};

#[derive(Debug, Parser)]
#[command(author, version, about = "Versioned time-series retrieval")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Verbosity level (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}
