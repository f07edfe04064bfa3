//! ChatProbe Semantic Grading
//!
//! Decides whether a captured answer is an acceptable match for the
//! expected one without requiring lexical equality:
//! - Texts are mapped to vectors by an [`EmbeddingModel`]
//! - Cosine similarity of the two vectors is the score
//! - A score at or above the threshold is a PASS
//! - Verdicts are aggregated into a [`ResultSummary`] over evaluated turns
//!
//! [`validate_workbook`] runs the whole pipeline over a result workbook and
//! writes the verdicts back into it.
//!
//! [`ResultSummary`]: chatprobe_common::ResultSummary

pub mod embedding;
pub mod error;
pub mod grading;
pub mod validate;

pub use embedding::{cosine_similarity, EmbeddingModel, HttpEmbedder};
pub use error::{GradeError, GradeResult};
pub use grading::{aggregate, AnswerText, Grader};
pub use validate::{validate_workbook, RowOutcome, ValidationReport};
