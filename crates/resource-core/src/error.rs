use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy shared by every resource-subsystem crate.
///
/// Matches the outcome kinds a resource-loader must distinguish: a missing
/// resource is never the same thing as a broken one, and both are distinct
/// from a filesystem-level hiccup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    /// The id was not found across any resolved root.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The on-disk YAML/JSON failed to parse.
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser's error message.
        message: String,
    },

    /// The parsed value failed schema validation.
    #[error("schema error in {path}: {}", errors.first().map(String::as_str).unwrap_or("unknown"))]
    SchemaError {
        /// File the structured value was parsed from.
        path: PathBuf,
        /// Every validation failure, in the order the validator produced them.
        errors: Vec<String>,
    },

    /// A transient filesystem failure (permission, disappeared mid-read).
    #[error("io error at {path}: {source}")]
    IoError {
        /// File being read or written when the failure occurred.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The safe writer detected an inconsistent state between steps.
    #[error("write conflict: {0}")]
    WriteConflict(String),

    /// A hot-reload handler exceeded its deadline.
    #[error("handler timeout: {0}")]
    HandlerTimeout(String),

    /// The on-disk sync manifest could not be parsed.
    #[error("manifest corruption: {0}")]
    ManifestCorruption(String),
}

impl ResourceError {
    /// Build an [`ResourceError::IoError`] tagging the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Build a [`ResourceError::ParseError`] tagging the path that failed.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`ResourceError::SchemaError`] tagging the path that failed.
    pub fn schema(path: impl Into<PathBuf>, errors: Vec<String>) -> Self {
        Self::SchemaError {
            path: path.into(),
            errors,
        }
    }
}

/// Result alias used across the resource subsystem.
pub type ResourceResult<T> = std::result::Result<T, ResourceError>;
