use thiserror::Error;

use crate::model::{MockTestError, QuestionError, SessionStateError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    MockTest(#[from] MockTestError),
    #[error(transparent)]
    SessionState(#[from] SessionStateError),
}
