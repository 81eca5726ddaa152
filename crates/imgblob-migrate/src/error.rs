//! Error types for the migration
//!
//! Run-level failures ([`MigrateError`]) stop the job before any table is
//! touched. Row-level failures ([`RowError`]) are recorded in the report and
//! never stop the table they belong to.

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Errors that abort the whole run
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Settings file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings were parsed but failed validation; holds every message
    #[error("Validation failed with {} error(s)", .0.len())]
    Validation(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MigrateError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<figment::Error> for MigrateError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Failure of a single row. `Display` is the message shown to the operator.
#[derive(Error, Debug)]
pub enum RowError {
    #[error("Image not found: {} in {table} table", .full_path.display())]
    FileMissing { full_path: PathBuf, table: String },

    /// Absolute path value or one climbing out with `..`
    #[error("Error processing image {path}: path leaves the images folder")]
    OutsideRoot { path: String },

    #[error("Error converting image {path} to binary")]
    Compression { path: String },

    #[error("Error processing image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error processing image {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    /// Anything else raised while handling the row, e.g. a compressor panic
    #[error("Error processing image {path}: {message}")]
    Unexpected { path: String, message: String },
}
