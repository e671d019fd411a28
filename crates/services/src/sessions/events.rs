use exam_core::model::{MockTestDetail, TestId, TestResult};

use crate::api::AttemptAck;
use crate::error::ApiError;

/// Messages posted by background tasks back to the controller.
///
/// Each carries the epoch of the session that spawned it; anything from an
/// older epoch is dropped on arrival.
#[derive(Debug)]
#[non_exhaustive]
pub enum SessionEvent {
    DetailLoaded {
        epoch: u64,
        test_id: TestId,
        result: Box<Result<MockTestDetail, ApiError>>,
    },
    Tick {
        epoch: u64,
        run: u64,
    },
    AutoAdvance {
        epoch: u64,
        from: usize,
    },
}

/// What the front end should react to after an event or operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Started {
        resumed: bool,
    },
    ResumeAvailable {
        test_id: TestId,
        answered: usize,
        time_remaining_seconds: u32,
    },
    /// The test was already scored in an earlier run but the server never
    /// acknowledged it. The session opens on its results, ready for a retry.
    SubmissionPending {
        test_id: TestId,
        score: u32,
    },
    LoadFailed(String),
    EmptyTest,
    Ticked {
        remaining: u32,
    },
    Advanced {
        index: usize,
    },
    Submitted {
        timed_out: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    Moved(usize),
    AllAnswered,
}

/// Final result of a session as shown on the results screen.
///
/// `result` is computed locally and always present; `server_ack` and
/// `sync_warning` describe the remote submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub result: TestResult,
    pub server_ack: Option<AttemptAck>,
    pub sync_warning: Option<String>,
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.sync_warning.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    NeedsConfirmation { unanswered: usize },
    Submitted(SubmissionOutcome),
    /// The session was already submitted; nothing was sent.
    AlreadySubmitted,
    /// The confirmation was declined and the session continues.
    Cancelled,
}
