//! Batch coordinator
//!
//! Runs one unit of work per configured table, each on its own store
//! connection, waits for all of them and merges their outcomes into a
//! [`RunReport`]. A failing or panicking table never affects the others.

use crate::compress::Compressor;
use crate::processor::{panic_message, TableProcessor};
use crate::report::{RunReport, TableOutcome};
use crate::settings::{TargetTable, ValidatedSettings};
use crate::store::StoreConnector;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// How table units are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// All tables at once, one task each
    #[default]
    Parallel,
    /// One table after another
    Sequential,
}

pub struct BatchCoordinator {
    settings: Arc<ValidatedSettings>,
    connector: Arc<dyn StoreConnector>,
    compressor: Arc<dyn Compressor>,
    mode: RunMode,
}

impl BatchCoordinator {
    pub fn new(
        settings: ValidatedSettings,
        connector: Arc<dyn StoreConnector>,
        compressor: Arc<dyn Compressor>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            connector,
            compressor,
            mode: RunMode::Parallel,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Process every table and build the report. Table and row failures are
    /// data in the report, so this never fails.
    pub async fn run(&self) -> RunReport {
        let start_time = Instant::now();

        info!(
            tables = self.settings.tables().len(),
            mode = ?self.mode,
            root = %self.settings.root_path().display(),
            "Starting image conversion"
        );

        let outcomes = match self.mode {
            RunMode::Parallel => self.run_parallel().await,
            RunMode::Sequential => self.run_sequential().await,
        };

        let report = RunReport::merge(outcomes, start_time.elapsed());

        info!(
            processed = report.total_processed(),
            errors = report.total_errors(),
            "Image conversion completed in {:.2}s",
            report.elapsed.as_secs_f64()
        );

        report
    }

    async fn run_parallel(&self) -> Vec<TableOutcome> {
        let handles: Vec<_> = self
            .settings
            .tables()
            .iter()
            .map(|table| {
                tokio::spawn(run_table_unit(
                    Arc::clone(&self.settings),
                    table.clone(),
                    Arc::clone(&self.connector),
                    Arc::clone(&self.compressor),
                ))
            })
            .collect();

        // Every handle is awaited, whatever happened to the others
        let results = futures::future::join_all(handles).await;

        results
            .into_iter()
            .zip(self.settings.tables())
            .map(|(result, table)| match result {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        join_error.to_string()
                    };
                    aborted(table, &message)
                },
            })
            .collect()
    }

    async fn run_sequential(&self) -> Vec<TableOutcome> {
        let mut outcomes = Vec::with_capacity(self.settings.tables().len());

        for table in self.settings.tables() {
            let unit = run_table_unit(
                Arc::clone(&self.settings),
                table.clone(),
                Arc::clone(&self.connector),
                Arc::clone(&self.compressor),
            );

            let outcome = match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => aborted(table, &panic_message(payload)),
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

/// One table from connect to close
async fn run_table_unit(
    settings: Arc<ValidatedSettings>,
    table: TargetTable,
    connector: Arc<dyn StoreConnector>,
    compressor: Arc<dyn Compressor>,
) -> TableOutcome {
    let mut store = match connector.connect().await {
        Ok(store) => store,
        Err(e) => {
            error!(table = %table.table_name, error = %e, "Could not open database connection");
            return TableOutcome::failed(
                table.table_name.as_str(),
                format!(
                    "Error connecting to database for {} table: {}",
                    table.table_name, e
                ),
            );
        },
    };

    let processor = TableProcessor::new(settings.root_path(), &table, compressor);
    let outcome = processor.run(store.as_mut()).await;

    if let Err(e) = store.close().await {
        warn!(table = %table.table_name, error = %e, "Failed to close database connection");
    }

    outcome
}

fn aborted(table: &TargetTable, message: &str) -> TableOutcome {
    error!(table = %table.table_name, "Table unit aborted: {}", message);
    TableOutcome::failed(
        table.table_name.as_str(),
        format!("Processing of {} table aborted: {}", table.table_name, message),
    )
}
