use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, TestId};

/// Per-question outcome shown on the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBreakdownEntry {
    pub question_id: QuestionId,
    pub question: String,
    pub user_answer: Option<usize>,
    pub correct_answer: usize,
    pub is_correct: bool,
    pub explanation: String,
    pub flagged: bool,
    pub marked_for_review: bool,
    pub note: Option<String>,
}

/// Final, immutable outcome of a submitted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: TestId,
    /// Percentage in `0..=100`.
    pub score: u32,
    pub correct_answers: usize,
    pub total_questions: usize,
    #[serde(rename = "timeTaken")]
    pub time_taken_seconds: u32,
    pub breakdown: Vec<ResultBreakdownEntry>,
}

impl TestResult {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.breakdown
            .iter()
            .filter(|entry| entry.user_answer.is_none())
            .count()
    }

    #[must_use]
    pub fn incorrect(&self) -> usize {
        self.total_questions
            .saturating_sub(self.correct_answers)
            .saturating_sub(self.unanswered())
    }
}
