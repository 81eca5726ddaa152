//! Per-table conversion
//!
//! For one table: fetch every path value, then for each value resolve the file,
//! read it, compress it and write the bytes back keyed by the original value.
//! A failing row is logged and skipped; only a failed path query stops the
//! table.

use crate::compress::Compressor;
use crate::error::RowError;
use crate::report::{ConversionError, TableOutcome};
use crate::settings::TargetTable;
use crate::store::{RowSink, RowSource};
use futures::FutureExt;
use imgblob_common::content_type::mime_type;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct TableProcessor<'a> {
    root_path: &'a Path,
    table: &'a TargetTable,
    compressor: Arc<dyn Compressor>,
}

impl<'a> TableProcessor<'a> {
    pub fn new(root_path: &'a Path, table: &'a TargetTable, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            root_path,
            table,
            compressor,
        }
    }

    /// `root / images_folder_path / path_value`
    pub fn full_image_path(&self, path_value: &str) -> PathBuf {
        self.root_path
            .join(&self.table.images_folder_path)
            .join(path_value)
    }

    /// Process every row of the table. Never fails; problems end up in the
    /// returned outcome's error log.
    #[instrument(skip_all, fields(table = %self.table.table_name))]
    pub async fn run<S>(&self, store: &mut S) -> TableOutcome
    where
        S: RowSource + RowSink + ?Sized,
    {
        let table_name = &self.table.table_name;
        info!("Processing table: {}", table_name);

        let paths = match store
            .fetch_paths(table_name, &self.table.image_path_column)
            .await
        {
            Ok(paths) => paths,
            Err(e) => {
                error!(error = %e, "Failed to fetch image paths");
                return TableOutcome::failed(
                    table_name.as_str(),
                    format!("Error fetching image paths from {} table: {}", table_name, e),
                );
            },
        };

        let mut outcome = TableOutcome::new(table_name.as_str());
        outcome.attempted = paths.len();
        debug!(rows = paths.len(), "Fetched image paths");

        for path_value in &paths {
            let row = AssertUnwindSafe(self.process_row(&mut *store, path_value))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(RowError::Unexpected {
                        path: path_value.clone(),
                        message: panic_message(payload),
                    })
                });

            match row {
                Ok(()) => outcome.processed += 1,
                Err(e) => {
                    warn!(image = %path_value, "{}", e);
                    outcome.errors.push(ConversionError::from_row(table_name.as_str(), &e));
                },
            }
        }

        info!(
            "Table {} completed: {} images processed, {} errors",
            table_name,
            outcome.processed,
            outcome.error_count()
        );

        outcome
    }

    async fn process_row<S>(&self, store: &mut S, path_value: &str) -> Result<(), RowError>
    where
        S: RowSink + ?Sized,
    {
        if !stays_under_root(path_value) {
            return Err(RowError::OutsideRoot {
                path: path_value.to_string(),
            });
        }

        let full_path = self.full_image_path(path_value);

        if !is_file(&full_path).await {
            return Err(RowError::FileMissing {
                full_path,
                table: self.table.table_name.clone(),
            });
        }

        let raw = tokio::fs::read(&full_path)
            .await
            .map_err(|source| RowError::Read {
                path: path_value.to_string(),
                source,
            })?;

        let content_type = mime_type(&full_path);
        let compressed = self.compress(raw, content_type, path_value).await?;

        let matched = store
            .update_binary(
                &self.table.table_name,
                &self.table.image_path_column,
                &self.table.binary_column,
                path_value,
                Some(&compressed),
            )
            .await
            .map_err(|source| RowError::Store {
                path: path_value.to_string(),
                source,
            })?;

        if matched == 0 {
            debug!(image = %path_value, "Update matched no rows");
        }

        Ok(())
    }

    /// Runs the compressor on the blocking pool; a panic becomes a row error.
    async fn compress(
        &self,
        raw: Vec<u8>,
        content_type: String,
        path_value: &str,
    ) -> Result<Vec<u8>, RowError> {
        let compressor = Arc::clone(&self.compressor);
        let result =
            tokio::task::spawn_blocking(move || compressor.compress(&raw, &content_type)).await;

        match result {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(RowError::Compression {
                path: path_value.to_string(),
            }),
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                Err(RowError::Unexpected {
                    path: path_value.to_string(),
                    message,
                })
            },
        }
    }
}

/// Only plain relative paths; absolute paths and `..` would leave the images folder.
fn stays_under_root(path_value: &str) -> bool {
    Path::new(path_value)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
