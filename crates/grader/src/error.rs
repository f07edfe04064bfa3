//! Error types for grading

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Nothing to grade: {0}")]
    MissingText(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] chatprobe_common::Error),
}

impl GradeError {
    /// Errors that abort a validation pass instead of skipping one row
    pub fn is_fatal(&self) -> bool {
        matches!(self, GradeError::Store(_))
    }
}

pub type GradeResult<T> = Result<T, GradeError>;
