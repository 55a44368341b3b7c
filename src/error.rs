use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type EtlResult<T> = Result<T, EtlError>;

/// Error type returned by extractors, loaders and the pipeline engine.
///
/// Every variant here is fatal for the run that produced it. Problems with a single record
/// (a skipped duplicate, a rejected insert) are reported as [`crate::load::WriteOutcome`]s
/// instead and never surface as an `EtlError`.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Underlying I/O error (e.g. permission denied while reading).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet reader error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited text reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON reader error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet reader error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[cfg(feature = "sql")]
    /// Database driver error outside of a single record write (feature-gated behind `sql`).
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// Invalid file-matching pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The run is missing an extractor, loader or mapping, or a component is misconfigured.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// An input file or destination could not be opened.
    #[error("cannot open '{}': {message}", path.display())]
    ResourceOpen { path: PathBuf, message: String },

    /// Source discovery found zero or several files where exactly one was expected.
    #[error("file match for '{pattern}' in '{}': {message}", dir.display())]
    FileMatch {
        dir: PathBuf,
        pattern: String,
        message: String,
    },

    /// A spreadsheet column name could not be converted.
    #[error("invalid column '{input}': {message}")]
    InvalidColumn { input: String, message: String },

    /// A value could not be converted to the required [`crate::types::DataType`].
    #[error("failed to parse value at record {row} field '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

impl EtlError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ResourceOpen {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
