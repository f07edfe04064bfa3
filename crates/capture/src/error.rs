//! Error types for response capture

use std::time::Duration;
use thiserror::Error;

use crate::surface::SurfaceError;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("WebDriver failed to start: {0}")]
    DriverStartup(String),

    #[error("WebDriver health check failed after {0} attempts")]
    DriverHealthCheck(usize),

    #[error("Setup failed: {step} - {reason}")]
    Setup { step: String, reason: String },

    #[error("No new answer block appeared within {waited:?}")]
    AppearanceTimeout { waited: Duration },

    #[error("Answer block never yielded readable text within {waited:?}")]
    NoAnswerText { waited: Duration },

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Target profile parse error: {0}")]
    ProfileParse(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Store error: {0}")]
    Store(#[from] chatprobe_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CaptureError {
    /// Errors that abort the whole run rather than a single turn
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CaptureError::DriverStartup(_)
                | CaptureError::DriverHealthCheck(_)
                | CaptureError::Setup { .. }
                | CaptureError::Store(_)
                | CaptureError::Io(_)
        )
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
