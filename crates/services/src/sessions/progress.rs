use exam_core::model::{MockTestDetail, SessionState, TestId};
use exam_core::navigation::{Palette, PaletteCounts, PaletteFilter};
use exam_core::time::format_countdown;

use super::phase::SessionPhase;

/// Read-only view of a running session for front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub test_id: TestId,
    pub title: String,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered: usize,
    pub flagged: usize,
    pub review: usize,
    pub time_remaining_seconds: u32,
    pub countdown: String,
    pub auto_advance: bool,
    pub filter: PaletteFilter,
    /// Question indices shown in the palette under `filter`.
    pub visible: Vec<usize>,
    pub counts: PaletteCounts,
}

impl SessionProgress {
    #[must_use]
    pub fn new(
        detail: &MockTestDetail,
        state: &SessionState,
        phase: SessionPhase,
        filter: PaletteFilter,
    ) -> Self {
        let palette = Palette::new(detail, state);
        let counts = palette.counts();
        Self {
            test_id: detail.id(),
            title: detail.summary.title.clone(),
            phase,
            current_index: state.current_question_index(),
            total_questions: detail.total_questions(),
            answered: counts.answered,
            flagged: counts.flagged,
            review: counts.review,
            time_remaining_seconds: state.time_remaining_seconds(),
            countdown: format_countdown(state.time_remaining_seconds()),
            auto_advance: state.auto_advance(),
            filter,
            visible: palette.visible(filter),
            counts,
        }
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total_questions - self.answered
    }
}
