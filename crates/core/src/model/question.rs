use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Fewest options a question may carry.
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may carry.
pub const MAX_OPTIONS: usize = 12;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} text cannot be empty")]
    EmptyText { id: QuestionId },

    #[error("question {id} has {len} options, expected 2..=12")]
    OptionCount { id: QuestionId, len: usize },

    #[error("question {id} correct answer {index} is outside {len} options")]
    CorrectAnswerOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "question", alias = "text")]
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub topic: String,
}

impl Question {
    /// Number of selectable options.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Returns true when `index` addresses one of this question's options.
    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    /// Check the structural rules a loaded question must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is blank, the option count is out of
    /// bounds, or `correct_answer` does not index into `options`.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText { id: self.id });
        }
        let len = self.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&len) {
            return Err(QuestionError::OptionCount { id: self.id, len });
        }
        if self.correct_answer >= len {
            return Err(QuestionError::CorrectAnswerOutOfRange {
                id: self.id,
                index: self.correct_answer,
                len,
            });
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
