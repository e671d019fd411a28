//! Client-side scoring of a finished session.
//!
//! Pure and deterministic: the same detail and state always give the same
//! `TestResult`.

use crate::model::{MockTestDetail, ResultBreakdownEntry, SessionState, TestResult};

/// Percentage of `correct` over `total`, rounded half-up to a whole number.
///
/// An empty test scores zero.
#[must_use]
pub fn percent_score(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    // floor(100 * c / t + 0.5) in integer arithmetic
    let score = (200 * correct + total) / (2 * total);
    u32::try_from(score).unwrap_or(100)
}

/// Seconds used so far, never more than the allotted time.
#[must_use]
pub fn time_taken_seconds(detail: &MockTestDetail, state: &SessionState) -> u32 {
    detail
        .duration_seconds()
        .saturating_sub(state.time_remaining_seconds())
}

/// Score `state` against the answer key in `detail`.
///
/// A question counts as correct only when its recorded answer equals
/// `correct_answer`; an unanswered question is never correct. Eliminations
/// do not influence the result.
#[must_use]
pub fn score_session(detail: &MockTestDetail, state: &SessionState) -> TestResult {
    let breakdown: Vec<ResultBreakdownEntry> = detail
        .questions
        .iter()
        .map(|question| {
            let user_answer = state.answer(question.id);
            ResultBreakdownEntry {
                question_id: question.id,
                question: question.text.clone(),
                user_answer,
                correct_answer: question.correct_answer,
                is_correct: user_answer == Some(question.correct_answer),
                explanation: question.explanation.clone(),
                flagged: state.is_flagged(question.id),
                marked_for_review: state.is_marked_for_review(question.id),
                note: state.note(question.id).map(str::to_owned),
            }
        })
        .collect();

    let correct_answers = breakdown.iter().filter(|entry| entry.is_correct).count();
    let total_questions = detail.total_questions();

    TestResult {
        test_id: detail.id(),
        score: percent_score(correct_answers, total_questions),
        correct_answers,
        total_questions,
        time_taken_seconds: time_taken_seconds(detail, state),
        breakdown,
    }
}
