//! Error types for loading, reshaping and rendering a recording.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure a single analysis pass can report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("missing required field '{0}'")]
    MissingRequiredField(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("duplicate column '{0}' in flattened table")]
    DuplicateColumn(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Map an `io::Error` on `path`, turning `NotFound` into [`AnalysisError::FileNotFound`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AnalysisError::FileNotFound { path }
        } else {
            AnalysisError::Io { path, source }
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;
