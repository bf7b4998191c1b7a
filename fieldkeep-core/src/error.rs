/*!
Error types for the fieldkeep core engine.
*/

use thiserror::Error;

/// Result type used throughout the fieldkeep core.
pub type Result<T> = std::result::Result<T, FieldkeepError>;

/// Errors that can occur while extracting, persisting or restoring fields.
#[derive(Error, Debug)]
pub enum FieldkeepError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed document markup
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Unreadable or unwritable document package
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// One extraction strategy failed; its group is left empty
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Backup record could not be written
    #[error("Failed to persist backup to {path}: {reason}")]
    Persist { path: String, reason: String },

    /// Backup record missing or unparsable
    #[error("Failed to load backup from {path}: {reason}")]
    Load { path: String, reason: String },

    /// Target document unreadable or output unwritable
    #[error("Restore error: {0}")]
    Restore(String),

    /// Document package is structurally unusable
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl FieldkeepError {
    /// Create a new extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a new persist error for the given backup path
    pub fn persist<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Persist {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new load error for the given backup path
    pub fn load<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new restore error
    pub fn restore<S: Into<String>>(msg: S) -> Self {
        Self::Restore(msg.into())
    }

    /// Create a new invalid document error
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors that abort a whole operation rather than one strategy.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Extraction(_))
    }
}
