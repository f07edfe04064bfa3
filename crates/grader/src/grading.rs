//! Scoring, thresholding and aggregation

use chatprobe_common::{
    CellValue, ChatTurn, ResultSummary, SimilarityJudgment, Verdict, CAPTURE_ERROR_SENTINEL,
};
use tracing::debug;

use crate::embedding::EmbeddingModel;
use crate::error::{GradeError, GradeResult};

/// Default minimum similarity for a PASS
pub const DEFAULT_THRESHOLD: f64 = 0.60;

/// Anything that can stand in for an answer. Numbers are compared by their
/// textual form, so a cell holding `42` grades like the text `"42"`.
pub trait AnswerText {
    /// The text to embed, or `None` when the value is absent
    fn answer_text(&self) -> Option<String>;
}

impl AnswerText for str {
    fn answer_text(&self) -> Option<String> {
        CellValue::from(self).as_text()
    }
}

impl AnswerText for String {
    fn answer_text(&self) -> Option<String> {
        self.as_str().answer_text()
    }
}

impl AnswerText for CellValue {
    fn answer_text(&self) -> Option<String> {
        self.as_text()
    }
}

impl AnswerText for i64 {
    fn answer_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl AnswerText for f64 {
    fn answer_text(&self) -> Option<String> {
        CellValue::Number(*self).as_text()
    }
}

impl<T: AnswerText + ?Sized> AnswerText for &T {
    fn answer_text(&self) -> Option<String> {
        (**self).answer_text()
    }
}

impl<T: AnswerText> AnswerText for Option<T> {
    fn answer_text(&self) -> Option<String> {
        self.as_ref().and_then(AnswerText::answer_text)
    }
}

/// Grades answers with one embedding model
pub struct Grader<M> {
    model: M,
    threshold: f64,
}

impl<M: EmbeddingModel> Grader<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Threshold used by [`Grader::judge_turn`]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Cosine similarity of the two texts' embeddings, in [0, 1]
    pub async fn score(
        &self,
        expected: &(impl AnswerText + ?Sized),
        actual: &(impl AnswerText + ?Sized),
    ) -> GradeResult<f64> {
        let expected = expected
            .answer_text()
            .ok_or(GradeError::MissingText("expected answer"))?;
        let actual = actual
            .answer_text()
            .ok_or(GradeError::MissingText("captured answer"))?;
        self.score_text(&expected, &actual).await
    }

    async fn score_text(&self, expected: &str, actual: &str) -> GradeResult<f64> {
        let a = self.model.encode(expected).await?;
        let b = self.model.encode(actual).await?;
        Ok(self.model.cosine_similarity(&a, &b))
    }

    /// Score and classify one pair. PASS iff `score >= threshold`.
    ///
    /// The capture error placeholder is a FAIL with score 0 and never
    /// reaches the model.
    pub async fn judge(
        &self,
        expected: &(impl AnswerText + ?Sized),
        actual: &(impl AnswerText + ?Sized),
        threshold: f64,
    ) -> GradeResult<SimilarityJudgment> {
        let expected = expected
            .answer_text()
            .ok_or(GradeError::MissingText("expected answer"))?;
        let actual = actual
            .answer_text()
            .ok_or(GradeError::MissingText("captured answer"))?;

        if actual.trim() == CAPTURE_ERROR_SENTINEL {
            debug!("Captured answer is the capture error placeholder, failing without scoring");
            return Ok(SimilarityJudgment {
                score: 0.0,
                verdict: Verdict::Fail,
            });
        }

        let score = self.score_text(&expected, &actual).await?;
        let verdict = if score >= threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Ok(SimilarityJudgment { score, verdict })
    }

    pub async fn grade(
        &self,
        expected: &(impl AnswerText + ?Sized),
        actual: &(impl AnswerText + ?Sized),
        threshold: f64,
    ) -> GradeResult<Verdict> {
        Ok(self.judge(expected, actual, threshold).await?.verdict)
    }

    /// Grade a turn in place. Turns missing either text stay UNVALIDATED
    /// and return `None`; a turn that already has a verdict is not re-graded.
    pub async fn judge_turn(&self, turn: &mut ChatTurn) -> GradeResult<Option<SimilarityJudgment>> {
        if !turn.is_gradable() || turn.verdict().is_evaluated() {
            return Ok(None);
        }

        let judgment = self
            .judge(&turn.expected_answer, &turn.captured_answer(), self.threshold)
            .await?;
        turn.record_verdict(judgment.verdict);
        Ok(Some(judgment))
    }
}

/// Count PASS and FAIL verdicts. UNVALIDATED turns are counted as skipped
/// and stay out of the percentage denominator.
pub fn aggregate(verdicts: impl IntoIterator<Item = Verdict>) -> ResultSummary {
    verdicts
        .into_iter()
        .fold(ResultSummary::default(), |mut summary, verdict| {
            match verdict {
                Verdict::Pass => summary.pass_count += 1,
                Verdict::Fail => summary.fail_count += 1,
                Verdict::Unvalidated => summary.skipped_count += 1,
            }
            summary
        })
}
