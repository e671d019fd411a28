mod ids;
mod question;
mod result;
mod session;

pub use ids::{ParseIdError, QuestionId, TestId};
pub use mock_test::{MockTestDetail, MockTestError, MockTestSummary};
pub use question::{Difficulty, MAX_OPTIONS, MIN_OPTIONS, Question, QuestionError};
pub use result::{ResultBreakdownEntry, TestResult};
pub use session::{SessionState, SessionStateError};
