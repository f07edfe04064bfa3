//! Error types for ChatProbe

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ChatProbe Error
pub type Result<T> = std::result::Result<T, Error>;

/// ChatProbe error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Result workbook not found: {}", path.display())]
    StoreNotFound { path: PathBuf },

    #[error("Workbook error ({}): {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("Workbook has no worksheet: {}", path.display())]
    NoWorksheet { path: PathBuf },
}

impl Error {
    /// Whether this error came from the tabular store rather than config
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::StoreNotFound { .. } | Error::Workbook { .. } | Error::NoWorksheet { .. }
        )
    }
}
