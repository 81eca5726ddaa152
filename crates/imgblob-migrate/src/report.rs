//! Per-table outcomes and the aggregate run report

use crate::error::RowError;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

/// What kind of failure a [`ConversionError`] records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The table could not be read at all (connect or path query failed)
    Table,
    FileMissing,
    /// Path value pointing outside the table's images folder
    InvalidPath,
    Compression,
    Store,
    Unexpected,
}

/// One logged failure, scoped to a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionError {
    pub scope: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ConversionError {
    pub fn table(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            kind: ErrorKind::Table,
            message: message.into(),
        }
    }

    pub fn from_row(scope: impl Into<String>, error: &RowError) -> Self {
        let kind = match error {
            RowError::FileMissing { .. } => ErrorKind::FileMissing,
            RowError::OutsideRoot { .. } => ErrorKind::InvalidPath,
            RowError::Compression { .. } => ErrorKind::Compression,
            RowError::Store { .. } => ErrorKind::Store,
            RowError::Read { .. } | RowError::Unexpected { .. } => ErrorKind::Unexpected,
        };

        Self {
            scope: scope.into(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of processing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOutcome {
    pub table_name: String,
    /// Rows returned by the path query
    pub attempted: usize,
    pub processed: usize,
    /// Errors logged for this table, in row order
    pub errors: Vec<ConversionError>,
}

impl TableOutcome {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            attempted: 0,
            processed: 0,
            errors: Vec::new(),
        }
    }

    /// Outcome of a table that failed before any row was attempted
    pub fn failed(table_name: impl Into<String>, message: impl Into<String>) -> Self {
        let table_name = table_name.into();
        let error = ConversionError::table(table_name.clone(), message);
        Self {
            errors: vec![error],
            ..Self::new(table_name)
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Counts for one table in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub table_name: String,
    pub attempted: usize,
    pub processed: usize,
    pub errored: usize,
}

/// Aggregate report of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tables: Vec<TableSummary>,
    /// Every error, grouped by table in settings order
    pub errors: Vec<ConversionError>,
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(elapsed.as_secs_f64())
}

impl RunReport {
    /// Merge per-table outcomes. `outcomes` must already be in settings order.
    pub fn merge(outcomes: Vec<TableOutcome>, elapsed: Duration) -> Self {
        let mut tables = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();

        for outcome in outcomes {
            tables.push(TableSummary {
                table_name: outcome.table_name.clone(),
                attempted: outcome.attempted,
                processed: outcome.processed,
                errored: outcome.errors.len(),
            });
            errors.extend(outcome.errors);
        }

        Self {
            tables,
            errors,
            elapsed,
        }
    }

    pub fn total_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn total_processed(&self) -> usize {
        self.tables.iter().map(|t| t.processed).sum()
    }

    pub fn table(&self, table_name: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }

    /// `(processed, errored)` for a table
    pub fn counts_for(&self, table_name: &str) -> Option<(usize, usize)> {
        self.table(table_name).map(|t| (t.processed, t.errored))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Plain-text rendering of the summary lines (errors are rendered by the caller)
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            let _ = writeln!(
                out,
                "Table {}: {} images processed, {} errors",
                table.table_name, table.processed, table.errored
            );
        }
        if self.has_errors() {
            let _ = writeln!(out, "Total errors: {}", self.total_errors());
        }
        let _ = write!(out, "Image conversion completed in {}", format_elapsed(self.elapsed));
        out
    }
}

/// `hh:mm:ss.fff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
