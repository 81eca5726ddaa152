//! Image settings model and validation
//!
//! [`ImageSettings`] mirrors the `ImageSettings` section of the settings file.
//! The migration only ever receives a [`ValidatedSettings`], which can only be
//! produced by [`ImageSettings::into_validated`].

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One table whose image paths should be turned into binary data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct TargetTable {
    #[serde(default)]
    pub table_name: String,
    #[serde(default)]
    pub image_path_column: String,
    #[serde(default)]
    pub binary_column: String,
    /// Folder relative to the root path holding this table's images
    #[serde(default)]
    pub images_folder_path: String,
}

impl TargetTable {
    pub fn new(
        table_name: impl Into<String>,
        image_path_column: impl Into<String>,
        binary_column: impl Into<String>,
        images_folder_path: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            image_path_column: image_path_column.into(),
            binary_column: binary_column.into(),
            images_folder_path: images_folder_path.into(),
        }
    }
}

/// Unvalidated image settings as read from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSettings {
    #[serde(default)]
    pub root_path: String,
    #[serde(default)]
    pub tables: Vec<TargetTable>,
}

impl ImageSettings {
    /// Collect every validation problem, in settings order.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        validate_root_path(&self.root_path, &mut errors);

        if self.tables.is_empty() {
            errors.push("No tables found in settings.".to_string());
            return errors;
        }

        for table in &self.tables {
            validate_identifier("TableName", &table.table_name, &mut errors);
            validate_identifier("ImagePathColumn", &table.image_path_column, &mut errors);
            validate_identifier("BinaryColumn", &table.binary_column, &mut errors);

            let images_folder = Path::new(&self.root_path).join(&table.images_folder_path);
            if !images_folder.is_dir() {
                errors.push(format!(
                    "ImagesFolderPath '{}' does not exist.",
                    images_folder.display()
                ));
            }
        }

        errors
    }

    pub fn into_validated(self) -> Result<ValidatedSettings> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(MigrateError::Validation(errors));
        }

        Ok(ValidatedSettings {
            root_path: PathBuf::from(self.root_path),
            tables: self.tables,
        })
    }
}

fn validate_root_path(root_path: &str, errors: &mut Vec<String>) {
    if root_path.trim().is_empty() {
        errors.push(format!("RootPath '{}' can't be null or empty", root_path));
        return;
    }

    if !Path::new(root_path).is_dir() {
        errors.push(format!("RootPath '{}' does not exist.", root_path));
    }
}

/// Table and column names end up in statement text, so only plain
/// identifiers (optionally schema-qualified or bracket-quoted) are accepted.
fn validate_identifier(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{} can't be null or empty", field));
        return;
    }

    if !is_sql_identifier(value) {
        errors.push(format!("{} '{}' is not a valid SQL identifier", field, value));
    }
}

pub(crate) fn is_sql_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Settings that passed validation; read-only for the rest of the run
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    root_path: PathBuf,
    tables: Vec<TargetTable>,
}

impl ValidatedSettings {
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn tables(&self) -> &[TargetTable] {
        &self.tables
    }
}
