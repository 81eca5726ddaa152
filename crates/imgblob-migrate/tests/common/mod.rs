//! Shared test fixtures: an in-memory database behind the store traits and
//! helpers for laying out image folders.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use imgblob_migrate::settings::{ImageSettings, TargetTable, ValidatedSettings};
use imgblob_migrate::store::{RowSink, RowSource, StoreConnector, StoreError, TableStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// One recorded `update_binary` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub table: String,
    pub path_column: String,
    pub binary_column: String,
    pub path_value: String,
    pub bytes: Option<Vec<u8>>,
}

#[derive(Default)]
struct State {
    /// table -> (path column, path values)
    tables: HashMap<String, (String, Vec<String>)>,
    failing_writes: HashSet<String>,
    panicking_writes: HashSet<String>,
    panicking_fetches: HashSet<String>,
    writes: Vec<WriteCall>,
    opened: usize,
    closed: usize,
}

/// In-memory stand-in for the database, shared by every fake connection
#[derive(Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, path_column: &str, paths: &[&str]) -> Self {
        self.state.lock().unwrap().tables.insert(
            table.to_string(),
            (
                path_column.to_string(),
                paths.iter().map(|p| p.to_string()).collect(),
            ),
        );
        self
    }

    /// Writes for `path_value` fail with a store error
    pub fn fail_write(self, path_value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(path_value.to_string());
        self
    }

    /// Writes for `path_value` panic inside the store
    pub fn panic_on_write(self, path_value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .panicking_writes
            .insert(path_value.to_string());
        self
    }

    /// Path queries against `table` panic inside the store
    pub fn panic_on_fetch(self, table: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .panicking_fetches
            .insert(table.to_string());
        self
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn writes_for(&self, table: &str) -> Vec<WriteCall> {
        self.writes().into_iter().filter(|w| w.table == table).collect()
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    pub fn store(&self) -> FakeStore {
        self.state.lock().unwrap().opened += 1;
        FakeStore { db: self.clone() }
    }
}

pub struct FakeStore {
    db: FakeDatabase,
}

#[async_trait]
impl RowSource for FakeStore {
    async fn fetch_paths(
        &mut self,
        table_name: &str,
        path_column: &str,
    ) -> Result<Vec<String>, StoreError> {
        // Checked before locking so the panic does not poison the shared state
        let explode = self.db.state.lock().unwrap().panicking_fetches.contains(table_name);
        if explode {
            panic!("path query exploded");
        }

        let state = self.db.state.lock().unwrap();
        match state.tables.get(table_name) {
            None => Err(StoreError::Other(format!("Invalid object name '{}'.", table_name))),
            Some((column, _)) if column != path_column => {
                Err(StoreError::Other(format!("Invalid column name '{}'.", path_column)))
            },
            Some((_, paths)) => Ok(paths.clone()),
        }
    }
}

#[async_trait]
impl RowSink for FakeStore {
    async fn update_binary(
        &mut self,
        table_name: &str,
        path_column: &str,
        binary_column: &str,
        path_value: &str,
        bytes: Option<&[u8]>,
    ) -> Result<u64, StoreError> {
        let explode = self.db.state.lock().unwrap().panicking_writes.contains(path_value);
        if explode {
            panic!("driver bug");
        }

        let mut state = self.db.state.lock().unwrap();
        if state.failing_writes.contains(path_value) {
            return Err(StoreError::Other("String or binary data would be truncated.".to_string()));
        }

        state.writes.push(WriteCall {
            table: table_name.to_string(),
            path_column: path_column.to_string(),
            binary_column: binary_column.to_string(),
            path_value: path_value.to_string(),
            bytes: bytes.map(<[u8]>::to_vec),
        });

        let matched = state
            .tables
            .get(table_name)
            .map(|(_, paths)| paths.iter().filter(|p| p.as_str() == path_value).count())
            .unwrap_or(0);
        Ok(matched as u64)
    }
}

#[async_trait]
impl TableStore for FakeStore {
    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        self.db.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Hands out [`FakeStore`]s, or refuses to connect
pub struct FakeConnector {
    pub db: FakeDatabase,
    pub refuse: bool,
}

impl FakeConnector {
    pub fn new(db: FakeDatabase) -> Arc<Self> {
        Arc::new(Self { db, refuse: false })
    }

    pub fn refusing(db: FakeDatabase) -> Arc<Self> {
        Arc::new(Self { db, refuse: true })
    }
}

#[async_trait]
impl StoreConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn TableStore>, StoreError> {
        if self.refuse {
            return Err(StoreError::Other("Login failed for user 'sa'.".to_string()));
        }
        Ok(Box::new(self.db.store()))
    }
}

/// Write `files` (relative to `root/folder`) with the given contents
pub fn write_images(root: &Path, folder: &str, files: &[(&str, &[u8])]) {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    for (name, bytes) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }
}

pub fn validated(root: &TempDir, tables: Vec<TargetTable>) -> ValidatedSettings {
    for table in &tables {
        std::fs::create_dir_all(root.path().join(&table.images_folder_path)).unwrap();
    }

    ImageSettings {
        root_path: root.path().to_string_lossy().to_string(),
        tables,
    }
    .into_validated()
    .unwrap()
}

/// Reverses the bytes: deterministic and easy to assert on
pub fn reversing(bytes: &[u8], _mime: &str) -> Option<Vec<u8>> {
    Some(bytes.iter().rev().copied().collect())
}
