use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, TestId};
use crate::model::mock_test::MockTestDetail;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session belongs to test {found}, expected {expected}")]
    TestMismatch { expected: TestId, found: TestId },

    #[error("question {0} is not part of this test")]
    UnknownQuestion(QuestionId),

    #[error("option {index} is out of range for question {question} ({len} options)")]
    OptionOutOfRange {
        question: QuestionId,
        index: usize,
        len: usize,
    },

    #[error("question index {index} is out of range ({len} questions)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("time remaining {remaining}s exceeds the {limit}s allotted")]
    TimeOutOfRange { remaining: u32, limit: u32 },
}

/// Mutable state of one attempt at a mock test.
///
/// Every mutator validates its question id (and option index) against the
/// loaded `MockTestDetail`, so the maps only ever reference real questions.
/// The whole struct is the persisted snapshot shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    test_id: TestId,
    #[serde(default)]
    answers: BTreeMap<QuestionId, usize>,
    #[serde(default)]
    flags: BTreeSet<QuestionId>,
    #[serde(default)]
    review: BTreeSet<QuestionId>,
    #[serde(default)]
    notes: BTreeMap<QuestionId, String>,
    #[serde(default)]
    eliminated: BTreeMap<QuestionId, BTreeSet<usize>>,
    time_remaining_seconds: u32,
    #[serde(default)]
    current_question_index: usize,
    #[serde(default = "default_auto_advance")]
    auto_advance: bool,
}

fn default_auto_advance() -> bool {
    true
}

impl SessionState {
    /// Fresh state for `detail`: nothing answered, full time on the clock.
    #[must_use]
    pub fn fresh(detail: &MockTestDetail, auto_advance: bool) -> Self {
        Self {
            test_id: detail.id(),
            answers: BTreeMap::new(),
            flags: BTreeSet::new(),
            review: BTreeSet::new(),
            notes: BTreeMap::new(),
            eliminated: BTreeMap::new(),
            time_remaining_seconds: detail.duration_seconds(),
            current_question_index: 0,
            auto_advance,
        }
    }

    /// Check a hydrated snapshot against the test it claims to belong to.
    ///
    /// # Errors
    ///
    /// Returns the first `SessionStateError` found.
    pub fn validate_against(&self, detail: &MockTestDetail) -> Result<(), SessionStateError> {
        if self.test_id != detail.id() {
            return Err(SessionStateError::TestMismatch {
                expected: detail.id(),
                found: self.test_id,
            });
        }
        for (&id, &index) in &self.answers {
            check_option(detail, id, index)?;
        }
        for (&id, options) in &self.eliminated {
            for &index in options {
                check_option(detail, id, index)?;
            }
        }
        for &id in self
            .flags
            .iter()
            .chain(self.review.iter())
            .chain(self.notes.keys())
        {
            check_question(detail, id)?;
        }
        check_index(detail, self.current_question_index)?;
        let limit = detail.duration_seconds();
        if self.time_remaining_seconds > limit {
            return Err(SessionStateError::TimeOutOfRange {
                remaining: self.time_remaining_seconds,
                limit,
            });
        }
        Ok(())
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn answer(&self, id: QuestionId) -> Option<usize> {
        self.answers.get(&id).copied()
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, usize> {
        &self.answers
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answers.contains_key(&id)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn flags(&self) -> &BTreeSet<QuestionId> {
        &self.flags
    }

    #[must_use]
    pub fn is_flagged(&self, id: QuestionId) -> bool {
        self.flags.contains(&id)
    }

    #[must_use]
    pub fn review(&self) -> &BTreeSet<QuestionId> {
        &self.review
    }

    #[must_use]
    pub fn is_marked_for_review(&self, id: QuestionId) -> bool {
        self.review.contains(&id)
    }

    #[must_use]
    pub fn notes(&self) -> &BTreeMap<QuestionId, String> {
        &self.notes
    }

    #[must_use]
    pub fn note(&self, id: QuestionId) -> Option<&str> {
        self.notes.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn eliminated(&self) -> &BTreeMap<QuestionId, BTreeSet<usize>> {
        &self.eliminated
    }

    #[must_use]
    pub fn is_eliminated(&self, id: QuestionId, option: usize) -> bool {
        self.eliminated
            .get(&id)
            .is_some_and(|set| set.contains(&option))
    }

    #[must_use]
    pub fn time_remaining_seconds(&self) -> u32 {
        self.time_remaining_seconds
    }

    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    // ─── Mutators ─────────────────────────────────────────────────────────────

    /// Record `option` as the answer to `id`, replacing any previous choice.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` for an unknown question or out-of-range option.
    pub fn select_answer(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
        option: usize,
    ) -> Result<(), SessionStateError> {
        check_option(detail, id, option)?;
        self.answers.insert(id, option);
        Ok(())
    }

    /// Remove the answer for `id`. Returns whether an answer was present.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` if `id` is not in the test.
    pub fn clear_answer(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
    ) -> Result<bool, SessionStateError> {
        check_question(detail, id)?;
        Ok(self.answers.remove(&id).is_some())
    }

    /// Toggle the flag marker. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` if `id` is not in the test.
    pub fn toggle_flag(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
    ) -> Result<bool, SessionStateError> {
        check_question(detail, id)?;
        Ok(toggle(&mut self.flags, id))
    }

    /// Toggle the review-later marker. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` if `id` is not in the test.
    pub fn toggle_review(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
    ) -> Result<bool, SessionStateError> {
        check_question(detail, id)?;
        Ok(toggle(&mut self.review, id))
    }

    /// Strike out (or restore) an option. The selected answer is left alone.
    /// Returns whether the option is now eliminated.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` for an unknown question or out-of-range option.
    pub fn toggle_eliminate(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
        option: usize,
    ) -> Result<bool, SessionStateError> {
        check_option(detail, id, option)?;
        let set = self.eliminated.entry(id).or_default();
        let now_eliminated = toggle(set, option);
        if set.is_empty() {
            self.eliminated.remove(&id);
        }
        Ok(now_eliminated)
    }

    /// Overwrite the note for `id`; an empty string clears it.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::UnknownQuestion` if `id` is not in the test.
    pub fn set_note(
        &mut self,
        detail: &MockTestDetail,
        id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), SessionStateError> {
        check_question(detail, id)?;
        let text = text.into();
        if text.is_empty() {
            self.notes.remove(&id);
        } else {
            self.notes.insert(id, text);
        }
        Ok(())
    }

    /// Move to `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::IndexOutOfRange` if `index` is past the last question.
    pub fn set_current_index(
        &mut self,
        detail: &MockTestDetail,
        index: usize,
    ) -> Result<(), SessionStateError> {
        check_index(detail, index)?;
        self.current_question_index = index;
        Ok(())
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    /// Take one second off the clock, never going below zero.
    /// Returns the remaining seconds.
    pub fn tick(&mut self) -> u32 {
        self.time_remaining_seconds = self.time_remaining_seconds.saturating_sub(1);
        self.time_remaining_seconds
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) -> bool {
    if set.remove(&value) {
        false
    } else {
        set.insert(value);
        true
    }
}

fn check_question(detail: &MockTestDetail, id: QuestionId) -> Result<(), SessionStateError> {
    detail
        .question(id)
        .map(|_| ())
        .ok_or(SessionStateError::UnknownQuestion(id))
}

fn check_option(
    detail: &MockTestDetail,
    id: QuestionId,
    index: usize,
) -> Result<(), SessionStateError> {
    let question = detail
        .question(id)
        .ok_or(SessionStateError::UnknownQuestion(id))?;
    if question.has_option(index) {
        Ok(())
    } else {
        Err(SessionStateError::OptionOutOfRange {
            question: id,
            index,
            len: question.option_count(),
        })
    }
}

fn check_index(detail: &MockTestDetail, index: usize) -> Result<(), SessionStateError> {
    let len = detail.total_questions();
    if index < len {
        Ok(())
    } else {
        Err(SessionStateError::IndexOutOfRange { index, len })
    }
}
