//! Remote mock-test API contract, wire payloads, and an in-memory backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use exam_core::model::{MockTestDetail, MockTestSummary, QuestionId, SessionState, TestId, TestResult};
use exam_core::scoring::percent_score;

use crate::error::ApiError;

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait MockTestApi: Send + Sync {
    /// `GET /mocktests/`
    async fn list_tests(&self) -> Result<Vec<MockTestSummary>, ApiError>;

    /// `GET /mocktests/{id}/`
    async fn get_test(&self, id: TestId) -> Result<MockTestDetail, ApiError>;

    /// `POST /mocktests/{id}/submit/`. Returns the server's evaluation when
    /// the response body parses as one.
    async fn submit(
        &self,
        id: TestId,
        payload: &SubmitPayload,
    ) -> Result<Option<AttemptAck>, ApiError>;

    /// `PATCH /mocktests/{id}/progress/`
    async fn save_progress(&self, id: TestId, payload: &ProgressPayload) -> Result<(), ApiError>;

    /// `GET /attempts/`
    async fn list_attempts(&self) -> Result<Vec<AttemptRecord>, ApiError>;

    /// `GET /me/progress/`
    async fn my_progress(&self) -> Result<ProgressOverview, ApiError>;
}

//
// ─── REQUEST PAYLOADS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    pub answers: BTreeMap<QuestionId, usize>,
    pub time_taken: u32,
    pub score: u32,
    pub flags: Vec<QuestionId>,
    pub review: Vec<QuestionId>,
    pub notes: BTreeMap<QuestionId, String>,
    pub eliminated: BTreeMap<QuestionId, Vec<usize>>,
}

impl SubmitPayload {
    #[must_use]
    pub fn new(state: &SessionState, result: &TestResult) -> Self {
        Self {
            answers: state.answers().clone(),
            time_taken: result.time_taken_seconds,
            score: result.score,
            flags: state.flags().iter().copied().collect(),
            review: state.review().iter().copied().collect(),
            notes: state.notes().clone(),
            eliminated: eliminated_lists(state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPayload {
    pub answers: BTreeMap<QuestionId, usize>,
    pub time_remaining: u32,
    pub current_question_index: usize,
    pub flags: Vec<QuestionId>,
    pub review: Vec<QuestionId>,
    pub notes: BTreeMap<QuestionId, String>,
    pub eliminated: BTreeMap<QuestionId, Vec<usize>>,
}

impl ProgressPayload {
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            answers: state.answers().clone(),
            time_remaining: state.time_remaining_seconds(),
            current_question_index: state.current_question_index(),
            flags: state.flags().iter().copied().collect(),
            review: state.review().iter().copied().collect(),
            notes: state.notes().clone(),
            eliminated: eliminated_lists(state),
        }
    }
}

fn eliminated_lists(state: &SessionState) -> BTreeMap<QuestionId, Vec<usize>> {
    state
        .eliminated()
        .iter()
        .map(|(id, options)| (*id, options.iter().copied().collect()))
        .collect()
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

/// Per-question line of the server's evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckBreakdownEntry {
    pub question: String,
    pub user_answer: Option<usize>,
    pub correct_answer: usize,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: String,
}

/// Server-side evaluation returned by the submit endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAck {
    pub score: u32,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub time_taken: u32,
    #[serde(default)]
    pub breakdown: Vec<AckBreakdownEntry>,
}

/// One finished attempt from the user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub mock_test: TestId,
    pub title: String,
    pub subject: String,
    pub score: u32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub time_taken_seconds: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject: String,
    pub attempts: u32,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentAttempt {
    pub id: Uuid,
    pub mock_test_id: TestId,
    #[serde(rename = "mock_test__title")]
    pub title: String,
    #[serde(rename = "mock_test__subject")]
    pub subject: String,
    pub score: u32,
    pub time_taken_seconds: u32,
    pub started_at: DateTime<Utc>,
}

/// Aggregate progress across all of the user's attempts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub total_attempts: u32,
    pub average_score: f64,
    #[serde(default)]
    pub by_subject: Vec<SubjectProgress>,
    #[serde(default)]
    pub recent: Vec<RecentAttempt>,
}

/// List endpoints answer either with a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Listing::Page { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryApiState {
    tests: Vec<MockTestDetail>,
    attempts: Vec<AttemptRecord>,
    submissions: Vec<(TestId, SubmitPayload)>,
    progress: Vec<(TestId, ProgressPayload)>,
    fail_detail: bool,
    fail_submit: bool,
    fail_progress: bool,
}

/// In-process API backend for tests and offline use.
///
/// Scores submissions itself, records every submit/progress call, and can be
/// told to fail individual endpoints.
#[derive(Clone, Default)]
pub struct InMemoryApi {
    inner: Arc<Mutex<InMemoryApiState>>,
}

impl InMemoryApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_test(self, detail: MockTestDetail) -> Self {
        if let Ok(mut guard) = self.inner.lock() {
            guard.tests.push(detail);
        }
        self
    }

    pub fn set_fail_detail(&self, fail: bool) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.fail_detail = fail;
        }
    }

    pub fn set_fail_submit(&self, fail: bool) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.fail_submit = fail;
        }
    }

    pub fn set_fail_progress(&self, fail: bool) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.fail_progress = fail;
        }
    }

    /// Every accepted submission, in order.
    #[must_use]
    pub fn submissions(&self) -> Vec<(TestId, SubmitPayload)> {
        self.inner
            .lock()
            .map(|guard| guard.submissions.clone())
            .unwrap_or_default()
    }

    /// Every progress push that reached the backend, in order.
    #[must_use]
    pub fn progress_pushes(&self) -> Vec<(TestId, ProgressPayload)> {
        self.inner
            .lock()
            .map(|guard| guard.progress.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryApiState>, ApiError> {
        self.inner
            .lock()
            .map_err(|e| ApiError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl MockTestApi for InMemoryApi {
    async fn list_tests(&self) -> Result<Vec<MockTestSummary>, ApiError> {
        let guard = self.lock()?;
        Ok(guard
            .tests
            .iter()
            .map(|detail| MockTestSummary {
                total_questions: detail.total_questions(),
                ..detail.summary.clone()
            })
            .collect())
    }

    async fn get_test(&self, id: TestId) -> Result<MockTestDetail, ApiError> {
        let guard = self.lock()?;
        if guard.fail_detail {
            return Err(ApiError::Unavailable("detail endpoint down".into()));
        }
        guard
            .tests
            .iter()
            .find(|detail| detail.id() == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("mocktests/{id}")))
    }

    async fn submit(
        &self,
        id: TestId,
        payload: &SubmitPayload,
    ) -> Result<Option<AttemptAck>, ApiError> {
        let mut guard = self.lock()?;
        if guard.fail_submit {
            return Err(ApiError::Unavailable("submit endpoint down".into()));
        }
        let detail = guard
            .tests
            .iter()
            .find(|detail| detail.id() == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("mocktests/{id}")))?;

        let breakdown: Vec<AckBreakdownEntry> = detail
            .questions
            .iter()
            .map(|q| {
                let user_answer = payload.answers.get(&q.id).copied();
                AckBreakdownEntry {
                    question: q.text.clone(),
                    user_answer,
                    correct_answer: q.correct_answer,
                    is_correct: user_answer == Some(q.correct_answer),
                    explanation: q.explanation.clone(),
                }
            })
            .collect();
        let correct = breakdown.iter().filter(|b| b.is_correct).count();
        let total = detail.total_questions();
        let time_taken = payload.time_taken.min(detail.duration_seconds());
        let ack = AttemptAck {
            score: percent_score(correct, total),
            correct_answers: correct,
            total_questions: total,
            time_taken,
            breakdown,
        };

        let now = Utc::now();
        guard.attempts.push(AttemptRecord {
            id: Uuid::new_v4(),
            mock_test: id,
            title: detail.summary.title.clone(),
            subject: detail.summary.subject.clone(),
            score: ack.score,
            correct_count: correct,
            total_questions: total,
            time_taken_seconds: time_taken,
            started_at: now - chrono::Duration::seconds(i64::from(time_taken)),
            completed_at: now,
        });
        guard.submissions.push((id, payload.clone()));
        Ok(Some(ack))
    }

    async fn save_progress(&self, id: TestId, payload: &ProgressPayload) -> Result<(), ApiError> {
        let mut guard = self.lock()?;
        if guard.fail_progress {
            return Err(ApiError::Unavailable("progress endpoint down".into()));
        }
        guard.progress.push((id, payload.clone()));
        Ok(())
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRecord>, ApiError> {
        let guard = self.lock()?;
        let mut attempts = guard.attempts.clone();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(attempts)
    }

    async fn my_progress(&self) -> Result<ProgressOverview, ApiError> {
        let guard = self.lock()?;
        Ok(overview_from_attempts(&guard.attempts))
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(scores: &[u32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    sum as f64 / scores.len() as f64
}

fn overview_from_attempts(attempts: &[AttemptRecord]) -> ProgressOverview {
    let mut by_subject: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for attempt in attempts {
        by_subject
            .entry(attempt.subject.as_str())
            .or_default()
            .push(attempt.score);
    }
    let all: Vec<u32> = attempts.iter().map(|a| a.score).collect();

    let mut recent: Vec<&AttemptRecord> = attempts.iter().collect();
    recent.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    ProgressOverview {
        total_attempts: u32::try_from(attempts.len()).unwrap_or(u32::MAX),
        average_score: average(&all),
        by_subject: by_subject
            .into_iter()
            .map(|(subject, scores)| SubjectProgress {
                subject: subject.to_string(),
                attempts: u32::try_from(scores.len()).unwrap_or(u32::MAX),
                average_score: average(&scores),
            })
            .collect(),
        recent: recent
            .into_iter()
            .take(5)
            .map(|a| RecentAttempt {
                id: a.id,
                mock_test_id: a.mock_test,
                title: a.title.clone(),
                subject: a.subject.clone(),
                score: a.score,
                time_taken_seconds: a.time_taken_seconds,
                started_at: a.started_at,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Difficulty, Question};
    use exam_core::scoring::score_session;

    fn detail(subject: &str) -> MockTestDetail {
        MockTestDetail {
            summary: MockTestSummary {
                id: TestId::random(),
                title: format!("{subject} basics"),
                subject: subject.into(),
                duration: 10,
                total_questions: 0,
                difficulty: Difficulty::Easy,
                topics: Vec::new(),
                description: String::new(),
                attempts: 0,
                average_score: 0.0,
            },
            questions: (0..2)
                .map(|i| Question {
                    id: QuestionId::random(),
                    text: format!("Q{i}"),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: 1,
                    explanation: String::new(),
                    difficulty: Difficulty::Easy,
                    subject: subject.into(),
                    topic: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn listing_accepts_both_shapes() {
        let plain: Listing<u32> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(plain.into_items(), vec![1, 2]);
        let page: Listing<u32> =
            serde_json::from_str(r#"{"count":2,"next":null,"previous":null,"results":[3,4]}"#)
                .unwrap();
        assert_eq!(page.into_items(), vec![3, 4]);
    }

    #[test]
    fn submit_payload_serializes_camel_case() {
        let d = detail("Math");
        let mut state = SessionState::fresh(&d, true);
        state.select_answer(&d, d.questions[0].id, 1).unwrap();
        state.toggle_eliminate(&d, d.questions[1].id, 0).unwrap();
        let result = score_session(&d, &state);
        let json = serde_json::to_value(SubmitPayload::new(&state, &result)).unwrap();
        assert_eq!(json["score"], 50);
        assert_eq!(json["timeTaken"], 0);
        assert_eq!(json["eliminated"][d.questions[1].id.to_string()][0], 0);
        assert!(json["flags"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_submit_records_attempt_and_progress() {
        let math = detail("Math");
        let api = InMemoryApi::new().with_test(math.clone());
        let mut state = SessionState::fresh(&math, true);
        for q in &math.questions {
            state.select_answer(&math, q.id, 1).unwrap();
        }
        let result = score_session(&math, &state);

        let ack = api
            .submit(math.id(), &SubmitPayload::new(&state, &result))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ack.score, 100);

        let attempts = api.list_attempts().await.unwrap();
        assert_eq!(attempts.len(), 1);
        let overview = api.my_progress().await.unwrap();
        assert_eq!(overview.total_attempts, 1);
        assert_eq!(overview.by_subject[0].subject, "Math");
        assert!((overview.average_score - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn in_memory_failures_are_switchable() {
        let math = detail("Math");
        let api = InMemoryApi::new().with_test(math.clone());
        api.set_fail_detail(true);
        assert!(api.get_test(math.id()).await.is_err());
        api.set_fail_detail(false);
        assert_eq!(api.get_test(math.id()).await.unwrap().id(), math.id());
        assert_eq!(api.list_tests().await.unwrap()[0].total_questions, 2);
    }
}
