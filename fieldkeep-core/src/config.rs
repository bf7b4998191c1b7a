//! Configuration for default output paths and the reference table
//!
//! Every setting has a default, so a config file only needs the keys it
//! changes.

use crate::{FieldkeepError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the reference table appended to restored documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Heading placed above the table
    pub heading: String,
    /// Heading level (1-9)
    pub heading_level: u8,
    /// Values longer than this many characters are cut
    pub value_limit: usize,
    /// Table style id; empty for the document default
    pub table_style: String,
    /// Text following the bold "Note: " run
    pub note: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            heading: "Extracted Field Values (Reference)".to_string(),
            heading_level: 2,
            value_limit: 200,
            table_style: "LightShading-Accent1".to_string(),
            note: "These are the original field values extracted before conversion. \
                   Use this reference to manually restore values if needed."
                .to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreserveConfig {
    /// Appended to the input stem to name the default backup file
    pub backup_suffix: String,
    /// Appended to the target stem to name the default restored document
    pub output_suffix: String,
    pub reference: ReferenceConfig,
}

impl Default for PreserveConfig {
    fn default() -> Self {
        Self {
            backup_suffix: "_bookmark_backup.json".to_string(),
            output_suffix: "_restored".to_string(),
            reference: ReferenceConfig::default(),
        }
    }
}

impl PreserveConfig {
    /// Read a JSON config file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            FieldkeepError::validation(format!("Cannot read config {}: {e}", path.display()))
        })?;
        let config: PreserveConfig = serde_json::from_str(&raw).map_err(|e| {
            FieldkeepError::validation(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backup_suffix.is_empty() {
            return Err(FieldkeepError::validation("backup_suffix must not be empty"));
        }
        if self.output_suffix.is_empty() {
            return Err(FieldkeepError::validation("output_suffix must not be empty"));
        }
        if !(1..=9).contains(&self.reference.heading_level) {
            return Err(FieldkeepError::validation(format!(
                "reference.heading_level must be between 1 and 9, got {}",
                self.reference.heading_level
            )));
        }
        if self.reference.value_limit == 0 {
            return Err(FieldkeepError::validation("reference.value_limit must be positive"));
        }
        Ok(())
    }

    /// `<dir>/<stem><backup_suffix>` for a source document
    pub fn backup_path_for<P: AsRef<Path>>(&self, input: P) -> PathBuf {
        sibling(input.as_ref(), &self.backup_suffix)
    }

    /// `<dir>/<stem><output_suffix>.docx` for a target document
    pub fn output_path_for<P: AsRef<Path>>(&self, target: P) -> PathBuf {
        sibling(target.as_ref(), &format!("{}.docx", self.output_suffix))
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}"))
}
