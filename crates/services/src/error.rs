//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{MockTestError, SessionStateError};
use storage::repository::StorageError;

use crate::sessions::SessionPhase;

/// Errors emitted by the mock-test API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no session is loaded")]
    NoSession,
    #[error("operation not allowed while {0}")]
    InvalidPhase(SessionPhase),
    #[error("mock test has no questions")]
    Empty,
    #[error("no failed submission to retry")]
    NothingToRetry,
    #[error(transparent)]
    Domain(#[from] exam_core::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<SessionStateError> for SessionError {
    fn from(err: SessionStateError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<MockTestError> for SessionError {
    fn from(err: MockTestError) -> Self {
        match err {
            MockTestError::NoQuestions => Self::Empty,
            other => Self::Domain(other.into()),
        }
    }
}
