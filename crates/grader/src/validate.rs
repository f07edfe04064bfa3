//! Validation pass over a result workbook

use std::path::{Path, PathBuf};

use chatprobe_common::{Column, ResultSummary, ResultWorkbook, SheetRow, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::EmbeddingModel;
use crate::error::GradeResult;
use crate::grading::{aggregate, Grader};

/// Header written above the verdict column
pub const VALIDATION_HEADER: &str = "Validation";

/// Grading outcome of one workbook row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row: u32,
    pub question: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub score: Option<f64>,
    pub verdict: Verdict,
    /// Why the row was not evaluated
    pub note: Option<String>,
}

/// Result of a validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub path: PathBuf,
    pub threshold: f64,
    pub rows: Vec<RowOutcome>,
    pub summary: ResultSummary,
}

/// Grade every row of the workbook at `path` and write PASS/FAIL into the
/// verdict column.
///
/// A missing or unreadable workbook is an error and nothing is written.
/// Rows missing either text, and rows whose embedding request fails, are
/// reported as skipped and keep their verdict cell untouched.
pub async fn validate_workbook<M: EmbeddingModel>(
    path: &Path,
    grader: &Grader<M>,
    threshold: f64,
) -> GradeResult<ValidationReport> {
    let mut workbook = ResultWorkbook::open(path)?;
    workbook.ensure_header(Column::Verdict, VALIDATION_HEADER);

    let mut outcomes = Vec::new();
    for row in workbook.rows()? {
        if row.question.is_empty() && row.expected.is_empty() && row.captured.is_empty() {
            continue;
        }

        let outcome = grade_row(grader, &row, threshold).await;
        if outcome.verdict.is_evaluated() {
            workbook.write_verdict(outcome.row, outcome.verdict)?;
        }
        outcomes.push(outcome);
    }

    let summary = aggregate(outcomes.iter().map(|o| o.verdict));
    workbook.save()?;
    info!("Validation of {}: {}", path.display(), summary);

    Ok(ValidationReport {
        path: path.to_path_buf(),
        threshold,
        rows: outcomes,
        summary,
    })
}

async fn grade_row<M: EmbeddingModel>(grader: &Grader<M>, row: &SheetRow, threshold: f64) -> RowOutcome {
    let mut outcome = RowOutcome {
        row: row.row,
        question: row.question.as_text(),
        expected: row.expected.as_text(),
        actual: row.captured.as_text(),
        score: None,
        verdict: Verdict::Unvalidated,
        note: None,
    };

    let missing = match (&outcome.expected, &outcome.actual) {
        (None, None) => Some("missing expected and captured answer"),
        (None, Some(_)) => Some("missing expected answer"),
        (Some(_), None) => Some("missing captured answer"),
        (Some(_), Some(_)) => None,
    };
    if let Some(reason) = missing {
        warn!("Row {}: skipped, {}", row.row, reason);
        outcome.note = Some(reason.to_string());
        return outcome;
    }

    let judged = grader.judge(&outcome.expected, &outcome.actual, threshold).await;
    match judged {
        Ok(judgment) => {
            info!(
                "Row {}: Expected: {}, Actual: {}, Score: {:.3}, Validation: {}",
                row.row,
                outcome.expected.as_deref().unwrap_or_default(),
                outcome.actual.as_deref().unwrap_or_default(),
                judgment.score,
                judgment.verdict
            );
            outcome.score = Some(judgment.score);
            outcome.verdict = judgment.verdict;
        }
        Err(e) => {
            warn!("Row {}: skipped, grading failed: {}", row.row, e);
            outcome.note = Some(e.to_string());
        }
    }
    outcome
}
