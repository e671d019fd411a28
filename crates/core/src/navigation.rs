//! Question palette: filtered index subsets and jump targets.
//!
//! The palette never moves the cursor on its own. `current_question_index`
//! may point outside the active filter (for example after unflagging the
//! current question while viewing flagged ones).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{MockTestDetail, QuestionId, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteFilter {
    #[default]
    All,
    Flagged,
    Review,
    Answered,
    Unanswered,
}

impl PaletteFilter {
    pub const ALL: [PaletteFilter; 5] = [
        PaletteFilter::All,
        PaletteFilter::Flagged,
        PaletteFilter::Review,
        PaletteFilter::Answered,
        PaletteFilter::Unanswered,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaletteFilter::All => "all",
            PaletteFilter::Flagged => "flagged",
            PaletteFilter::Review => "review",
            PaletteFilter::Answered => "answered",
            PaletteFilter::Unanswered => "unanswered",
        }
    }

    /// Whether question `id` belongs to this filter's subset.
    #[must_use]
    pub fn matches(self, state: &SessionState, id: QuestionId) -> bool {
        match self {
            PaletteFilter::All => true,
            PaletteFilter::Flagged => state.is_flagged(id),
            PaletteFilter::Review => state.is_marked_for_review(id),
            PaletteFilter::Answered => state.is_answered(id),
            PaletteFilter::Unanswered => !state.is_answered(id),
        }
    }
}

impl fmt::Display for PaletteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown palette filter: {0}")]
pub struct UnknownFilter(pub String);

impl FromStr for PaletteFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaletteFilter::ALL
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

/// Badge counts for every filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaletteCounts {
    pub all: usize,
    pub flagged: usize,
    pub review: usize,
    pub answered: usize,
    pub unanswered: usize,
}

impl PaletteCounts {
    #[must_use]
    pub fn get(&self, filter: PaletteFilter) -> usize {
        match filter {
            PaletteFilter::All => self.all,
            PaletteFilter::Flagged => self.flagged,
            PaletteFilter::Review => self.review,
            PaletteFilter::Answered => self.answered,
            PaletteFilter::Unanswered => self.unanswered,
        }
    }
}

/// Read-only view over a test and its session state for palette queries.
#[derive(Debug, Clone, Copy)]
pub struct Palette<'a> {
    detail: &'a MockTestDetail,
    state: &'a SessionState,
}

impl<'a> Palette<'a> {
    #[must_use]
    pub fn new(detail: &'a MockTestDetail, state: &'a SessionState) -> Self {
        Self { detail, state }
    }

    /// Indices visible under `filter`, in question order.
    #[must_use]
    pub fn visible(&self, filter: PaletteFilter) -> Vec<usize> {
        self.detail
            .questions
            .iter()
            .enumerate()
            .filter(|(_, q)| filter.matches(self.state, q.id))
            .map(|(index, _)| index)
            .collect()
    }

    #[must_use]
    pub fn counts(&self) -> PaletteCounts {
        let mut counts = PaletteCounts {
            all: self.detail.total_questions(),
            ..PaletteCounts::default()
        };
        for question in &self.detail.questions {
            if self.state.is_flagged(question.id) {
                counts.flagged += 1;
            }
            if self.state.is_marked_for_review(question.id) {
                counts.review += 1;
            }
            if self.state.is_answered(question.id) {
                counts.answered += 1;
            } else {
                counts.unanswered += 1;
            }
        }
        counts
    }

    /// Lowest index with no recorded answer.
    #[must_use]
    pub fn first_unanswered(&self) -> Option<usize> {
        self.detail
            .questions
            .iter()
            .position(|q| !self.state.is_answered(q.id))
    }

    /// Index after the current one, if any.
    #[must_use]
    pub fn next_index(&self) -> Option<usize> {
        let next = self.state.current_question_index() + 1;
        (next < self.detail.total_questions()).then_some(next)
    }

    /// Index before the current one, if any.
    #[must_use]
    pub fn previous_index(&self) -> Option<usize> {
        self.state.current_question_index().checked_sub(1)
    }

    /// Next index after the current one that is visible under `filter`.
    #[must_use]
    pub fn next_in(&self, filter: PaletteFilter) -> Option<usize> {
        let current = self.state.current_question_index();
        self.visible(filter).into_iter().find(|&index| index > current)
    }

    /// Whether the cursor currently sits inside the filter's subset.
    #[must_use]
    pub fn current_is_visible(&self, filter: PaletteFilter) -> bool {
        self.detail
            .question_at(self.state.current_question_index())
            .is_some_and(|q| filter.matches(self.state, q.id))
    }
}
