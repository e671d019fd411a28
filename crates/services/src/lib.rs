#![forbid(unsafe_code)]

pub mod api;
pub mod api_client;
pub mod config;
pub mod error;
pub mod sessions;

pub use exam_core::Clock;

pub use api::{
    AckBreakdownEntry, AttemptAck, AttemptRecord, InMemoryApi, MockTestApi, ProgressOverview,
    ProgressPayload, RecentAttempt, SubjectProgress, SubmitPayload,
};
pub use api_client::HttpMockTestApi;
pub use config::{ApiConfig, SessionConfig};
pub use error::{ApiError, SessionError};
pub use sessions::{
    JumpOutcome, ResumeChoice, SessionController, SessionEvent, SessionNotice, SessionPhase,
    PendingSubmission, SessionProgress, SnapshotStore, StoredSession, SubmissionOutcome,
    SubmitStatus,
};
