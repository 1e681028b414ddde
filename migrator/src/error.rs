//! Error types for the migration toolkit.
//!
//! Errors are split by where they can happen in a run:
//!
//! - [`LoadError`] - setup-time failures (input, mapping files, archives)
//! - [`ConversionError`] - a single row could not be mapped
//! - [`WriteError`] - the output or the report could not be written
//! - [`MigrationError`] - top-level error returned by the driver
//!
//! Row-level errors never leave the driver loop: they are counted and
//! logged. Only [`MigrationError`] reaches the CLI.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading the input file, mapping tables or archives.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Mapping file present but unusable.
    #[error("Malformed mapping file {path}: {reason}")]
    MalformedMapping { path: PathBuf, reason: String },

    /// Subscriber archive could not be opened or read.
    #[error("Cannot read archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// The tool was started without any input to read.
    #[error("No input given: {0}")]
    MissingInput(String),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors while mapping one structurally valid row.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Embedded JSON cell could not be decoded.
    #[error("Invalid JSON in column '{column}': {source}")]
    Json {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be interpreted.
    #[error("Invalid value for '{column}': {message}")]
    InvalidValue { column: String, message: String },
}

// =============================================================================
// Write Errors
// =============================================================================

/// Errors while writing the output CSV or the JSON report.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Filesystem failure.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialisation failure.
    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON serialisation failure.
    #[error("Failed to serialise report: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Migration Errors (top-level)
// =============================================================================

/// Top-level error of one migration run.
///
/// This is the error returned by [`crate::transform::pipeline::run_migration`].
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Setup failed, nothing was written.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Output could not be written.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for per-row conversion.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for a whole run.
pub type MigrationResult<T> = Result<T, MigrationError>;
