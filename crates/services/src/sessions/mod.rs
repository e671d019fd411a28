mod controller;
mod events;
mod phase;
mod progress;
mod snapshots;
mod sync;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::SessionController;
pub use events::{
    JumpOutcome, ResumeChoice, SessionEvent, SessionNotice, SubmissionOutcome, SubmitStatus,
};
pub use phase::SessionPhase;
pub use progress::SessionProgress;
pub use snapshots::{PendingSubmission, SnapshotStore, StoredSession};
