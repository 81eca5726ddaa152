//! imgblob migration library
//!
//! Moves images referenced by path columns into compressed binary columns.
//!
//! # Overview
//!
//! - **Settings**: [`config::AppConfig`] loads the settings file, [`settings`]
//!   validates it before anything runs
//! - **Store**: [`store::RowSource`] / [`store::RowSink`] over a per-table sqlx
//!   connection
//! - **Compression**: [`compress::Compressor`] implementations
//! - **Processing**: [`processor::TableProcessor`] handles one table,
//!   [`coordinator::BatchCoordinator`] runs all tables and builds the
//!   [`report::RunReport`]
//!
//! # Example
//!
//! ```no_run
//! use imgblob_migrate::{config::AppConfig, coordinator::BatchCoordinator, store::SqlStoreConnector};
//! use std::sync::Arc;
//!
//! # async fn run() -> imgblob_migrate::Result<()> {
//! let config = AppConfig::load("appsettings.json")?;
//! let settings = config.validated_settings()?;
//! let connector = Arc::new(SqlStoreConnector::new(config.database_url(None)?));
//!
//! let report = BatchCoordinator::new(settings, connector, config.compression.build())
//!     .run()
//!     .await;
//! println!("{} errors", report.total_errors());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod compress;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod processor;
pub mod report;
pub mod settings;
pub mod store;

pub use error::{MigrateError, Result};

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Convert image path columns into compressed binary columns
#[derive(Parser, Debug)]
#[command(name = "imgblob")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, env = "IMGBLOB_CONFIG", default_value = config::DEFAULT_SETTINGS_FILE)]
    pub config: PathBuf,

    /// Database URL, overrides DefaultConnection from the settings file
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Process tables one after another instead of all at once
    #[arg(long)]
    pub sequential: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Exit with a non-zero status when any row or table failed
    #[arg(long)]
    pub fail_on_errors: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
