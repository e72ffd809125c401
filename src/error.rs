use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading and preparing the expedition tables.
///
/// Per-record coercion problems are never errors: they become missing values
/// during cleaning. Only whole-file problems surface here.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported file extension for {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("table {table} is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("no usable expedition records in {}", path.display())]
    NoData { path: PathBuf },
}

impl DashError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        DashError::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
