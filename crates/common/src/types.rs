//! Core types for ChatProbe

use serde::{Deserialize, Serialize};

/// Raw value of a spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Textual form of the cell, or `None` when the cell holds nothing.
    ///
    /// Numbers are coerced to text so a numeric expected answer can be
    /// compared against a free-text reply. Whole numbers render without a
    /// fractional part (`42.0` becomes `"42"`).
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) if s.trim().is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_text().is_none()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Outcome of grading one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail,
    Unvalidated,
}

impl Default for Verdict {
    fn default() -> Self {
        Self::Unvalidated
    }
}

impl Verdict {
    /// Whether this verdict counts towards pass/fail statistics
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, Verdict::Unvalidated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Unvalidated => "UNVALIDATED",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" => Ok(Verdict::Pass),
            "FAIL" => Ok(Verdict::Fail),
            "" | "UNVALIDATED" => Ok(Verdict::Unvalidated),
            other => Err(format!("unknown verdict: {other}")),
        }
    }
}

/// One question submitted to the chat UI and its eventual answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Spreadsheet row the turn was read from (1-based, data starts at 2)
    pub row: u32,
    pub question: String,
    pub expected_answer: Option<String>,
    captured_answer: Option<String>,
    verdict: Verdict,
}

impl ChatTurn {
    pub fn new(row: u32, question: impl Into<String>, expected_answer: Option<String>) -> Self {
        Self {
            row,
            question: question.into(),
            expected_answer,
            captured_answer: None,
            verdict: Verdict::Unvalidated,
        }
    }

    pub fn captured_answer(&self) -> Option<&str> {
        self.captured_answer.as_deref()
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Record the captured answer. Returns false if one was already recorded.
    pub fn record_capture(&mut self, answer: impl Into<String>) -> bool {
        if self.captured_answer.is_some() {
            return false;
        }
        self.captured_answer = Some(answer.into());
        true
    }

    /// Record the grading verdict. `Unvalidated` is never recorded and a
    /// terminal verdict is never overwritten.
    pub fn record_verdict(&mut self, verdict: Verdict) -> bool {
        if self.verdict.is_evaluated() || !verdict.is_evaluated() {
            return false;
        }
        self.verdict = verdict;
        true
    }

    /// Both texts are present, so the turn can be graded
    pub fn is_gradable(&self) -> bool {
        self.expected_answer.is_some() && self.captured_answer.is_some()
    }
}

/// Output of one grading comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityJudgment {
    /// Cosine similarity in [0, 1]
    pub score: f64,
    pub verdict: Verdict,
}

/// Aggregate pass/fail counts over the graded turns of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub pass_count: usize,
    pub fail_count: usize,
    /// Turns that were not evaluated (missing expected or actual text)
    pub skipped_count: usize,
}

impl ResultSummary {
    /// Number of turns that received a PASS or FAIL
    pub fn evaluated(&self) -> usize {
        self.pass_count + self.fail_count
    }

    pub fn pass_percentage(&self) -> Option<f64> {
        percentage(self.pass_count, self.evaluated())
    }

    pub fn fail_percentage(&self) -> Option<f64> {
        percentage(self.fail_count, self.evaluated())
    }
}

fn percentage(part: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / total as f64)
    }
}

impl std::fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.pass_percentage(), self.fail_percentage()) {
            (Some(pass), Some(fail)) => write!(
                f,
                "Pass: {} ({:.1}%), Fail: {} ({:.1}%), Skipped: {}",
                self.pass_count, pass, self.fail_count, fail, self.skipped_count
            ),
            _ => write!(f, "No evaluated turns, Skipped: {}", self.skipped_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(CellValue::Number(42.0), Some("42") ; "whole number")]
    #[test_case(CellValue::Number(42.5), Some("42.5") ; "fractional number")]
    #[test_case(CellValue::Text("Paris".into()), Some("Paris") ; "text")]
    #[test_case(CellValue::Text("   ".into()), None ; "blank text")]
    #[test_case(CellValue::Empty, None ; "empty")]
    fn test_cell_as_text(cell: CellValue, expected: Option<&str>) {
        assert_eq!(cell.as_text().as_deref(), expected);
    }

    #[test]
    fn test_verdict_round_trips_through_cell_text() {
        for verdict in [Verdict::Pass, Verdict::Fail] {
            assert_eq!(verdict.to_string().parse::<Verdict>().unwrap(), verdict);
        }
        assert_eq!("".parse::<Verdict>().unwrap(), Verdict::Unvalidated);
        assert!("MAYBE".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_chat_turn_fields_are_write_once() {
        let mut turn = ChatTurn::new(2, "Capital of France?", Some("Paris".into()));
        assert!(!turn.is_gradable());

        assert!(turn.record_capture("Paris."));
        assert!(!turn.record_capture("Lyon."));
        assert_eq!(turn.captured_answer(), Some("Paris."));
        assert!(turn.is_gradable());

        assert!(!turn.record_verdict(Verdict::Unvalidated));
        assert!(turn.record_verdict(Verdict::Pass));
        assert!(!turn.record_verdict(Verdict::Fail));
        assert_eq!(turn.verdict(), Verdict::Pass);
    }

    #[test]
    fn test_summary_percentages_exclude_skipped() {
        let summary = ResultSummary {
            pass_count: 7,
            fail_count: 2,
            skipped_count: 1,
        };
        assert_eq!(summary.evaluated(), 9);
        let pass = summary.pass_percentage().unwrap();
        assert!((pass - 77.777).abs() < 0.01);
        assert_eq!(
            summary.to_string(),
            "Pass: 7 (77.8%), Fail: 2 (22.2%), Skipped: 1"
        );
    }

    #[test]
    fn test_summary_without_evaluated_turns() {
        let summary = ResultSummary {
            skipped_count: 3,
            ..Default::default()
        };
        assert_eq!(summary.pass_percentage(), None);
        assert_eq!(summary.to_string(), "No evaluated turns, Skipped: 3");
    }
}
