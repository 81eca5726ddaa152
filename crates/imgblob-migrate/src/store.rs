//! Persistence boundary
//!
//! [`RowSource`] reads the image path values of a table, [`RowSink`] writes the
//! compressed bytes back. Each table unit gets its own [`TableStore`] from a
//! [`StoreConnector`]; stores are never shared between units.
//!
//! Table and column names are interpolated into the statement text (they come
//! from validated settings and cannot be bound). Values are always bound.

use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("{0}")]
    Query(#[from] sqlx::Error),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait RowSource: Send {
    /// Non-null values of `path_column`, in the store's natural order
    async fn fetch_paths(
        &mut self,
        table_name: &str,
        path_column: &str,
    ) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait RowSink: Send {
    /// Set `binary_column` (NULL when `bytes` is `None`) on every row whose
    /// `path_column` equals `path_value`. Returns the number of rows matched.
    async fn update_binary(
        &mut self,
        table_name: &str,
        path_column: &str,
        binary_column: &str,
        path_value: &str,
        bytes: Option<&[u8]>,
    ) -> Result<u64, StoreError>;
}

/// A connection owned by one table unit
#[async_trait]
pub trait TableStore: RowSource + RowSink {
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Opens a fresh [`TableStore`] for each table unit
#[async_trait]
pub trait StoreConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn TableStore>, StoreError>;
}

/// Bind parameter style of the connected backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `$1, $2, ...` (PostgreSQL)
    Numbered,
    /// `?` (MySQL, SQLite)
    Positional,
}

impl Dialect {
    pub fn from_backend(backend_name: &str) -> Self {
        let name = backend_name.to_ascii_lowercase();
        if name == "postgresql" || name == "postgres" {
            Dialect::Numbered
        } else {
            Dialect::Positional
        }
    }

    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Numbered => format!("${}", index),
            Dialect::Positional => "?".to_string(),
        }
    }
}

pub fn select_paths_sql(table_name: &str, path_column: &str) -> String {
    format!(
        "SELECT {col} FROM {table} WHERE {col} IS NOT NULL",
        col = path_column,
        table = table_name
    )
}

pub fn update_binary_sql(
    dialect: Dialect,
    table_name: &str,
    path_column: &str,
    binary_column: &str,
) -> String {
    format!(
        "UPDATE {} SET {} = {} WHERE {} = {}",
        table_name,
        binary_column,
        dialect.placeholder(1),
        path_column,
        dialect.placeholder(2)
    )
}

/// sqlx-backed store; the URL scheme picks the backend
pub struct SqlStore {
    conn: AnyConnection,
    dialect: Dialect,
}

impl SqlStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let conn = AnyConnection::connect(url).await.map_err(StoreError::Connect)?;
        let dialect = Dialect::from_backend(conn.backend_name());
        debug!(backend = conn.backend_name(), ?dialect, "Opened database connection");

        Ok(Self { conn, dialect })
    }
}

#[async_trait]
impl RowSource for SqlStore {
    async fn fetch_paths(
        &mut self,
        table_name: &str,
        path_column: &str,
    ) -> Result<Vec<String>, StoreError> {
        let sql = select_paths_sql(table_name, path_column);
        let paths = sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(paths)
    }
}

#[async_trait]
impl RowSink for SqlStore {
    async fn update_binary(
        &mut self,
        table_name: &str,
        path_column: &str,
        binary_column: &str,
        path_value: &str,
        bytes: Option<&[u8]>,
    ) -> Result<u64, StoreError> {
        let sql = update_binary_sql(self.dialect, table_name, path_column, binary_column);
        let result = sqlx::query(&sql)
            .bind(bytes.map(<[u8]>::to_vec))
            .bind(path_value)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TableStore for SqlStore {
    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        let store = *self;
        store.conn.close().await?;
        Ok(())
    }
}

/// Connects [`SqlStore`]s to one database URL
#[derive(Debug, Clone)]
pub struct SqlStoreConnector {
    url: String,
}

impl SqlStoreConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl StoreConnector for SqlStoreConnector {
    async fn connect(&self) -> Result<Box<dyn TableStore>, StoreError> {
        let store = SqlStore::connect(&self.url).await?;
        Ok(Box::new(store))
    }
}
