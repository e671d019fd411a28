//! HTTP implementation of [`MockTestApi`] backed by `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use exam_core::model::{MockTestDetail, MockTestSummary, TestId};

use crate::api::{
    AttemptAck, AttemptRecord, Listing, MockTestApi, ProgressOverview, ProgressPayload,
    SubmitPayload,
};
use crate::config::ApiConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct HttpMockTestApi {
    client: Client,
    config: ApiConfig,
}

impl HttpMockTestApi {
    /// Build a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the TLS backend cannot be initialised.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MockTestApi for HttpMockTestApi {
    async fn list_tests(&self) -> Result<Vec<MockTestSummary>, ApiError> {
        let listing: Listing<MockTestSummary> = self.get_json("mocktests/").await?;
        Ok(listing.into_items())
    }

    async fn get_test(&self, id: TestId) -> Result<MockTestDetail, ApiError> {
        self.get_json(&format!("mocktests/{id}/")).await
    }

    async fn submit(
        &self,
        id: TestId,
        payload: &SubmitPayload,
    ) -> Result<Option<AttemptAck>, ApiError> {
        let path = format!("mocktests/{id}/submit/");
        let request = self.client.post(self.url(&path)).json(payload);
        let response = self.send(request, &path).await?;
        let bytes = response.bytes().await?;
        match serde_json::from_slice::<AttemptAck>(&bytes) {
            Ok(ack) => Ok(Some(ack)),
            Err(err) => {
                tracing::debug!(test = %id, error = %err, "submit response carried no evaluation");
                Ok(None)
            }
        }
    }

    async fn save_progress(&self, id: TestId, payload: &ProgressPayload) -> Result<(), ApiError> {
        let path = format!("mocktests/{id}/progress/");
        let request = self.client.patch(self.url(&path)).json(payload);
        self.send(request, &path).await?;
        Ok(())
    }

    async fn list_attempts(&self) -> Result<Vec<AttemptRecord>, ApiError> {
        let listing: Listing<AttemptRecord> = self.get_json("attempts/").await?;
        Ok(listing.into_items())
    }

    async fn my_progress(&self) -> Result<ProgressOverview, ApiError> {
        self.get_json("me/progress/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_ID: &str = "6f1c2d3e-0000-4000-8000-000000000001";
    const Q1: &str = "6f1c2d3e-0000-4000-8000-0000000000a1";

    fn client(server: &MockServer, token: Option<&str>) -> HttpMockTestApi {
        HttpMockTestApi::new(
            ApiConfig::new(format!("{}/", server.uri())).with_token(token.map(str::to_string)),
        )
        .unwrap()
    }

    fn detail_json() -> serde_json::Value {
        serde_json::json!({
            "id": TEST_ID,
            "title": "Algebra",
            "subject": "Math",
            "duration": 5,
            "totalQuestions": 1,
            "difficulty": "easy",
            "topics": ["linear"],
            "questions": [{
                "id": Q1,
                "question": "2 + 2 = ?",
                "options": ["3", "4"],
                "correctAnswer": 1,
                "explanation": "arithmetic"
            }]
        })
    }

    #[tokio::test]
    async fn list_tests_accepts_paginated_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mocktests/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "next": null,
                "previous": null,
                "results": [{
                    "id": TEST_ID,
                    "title": "Algebra",
                    "subject": "Math",
                    "duration": 5,
                    "totalQuestions": 1,
                    "difficulty": "easy"
                }]
            })))
            .mount(&server)
            .await;

        let tests = client(&server, None).list_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].title, "Algebra");
        assert_eq!(tests[0].duration_seconds(), 300);
    }

    #[tokio::test]
    async fn get_test_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/mocktests/{TEST_ID}/")))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail_json()))
            .expect(1)
            .mount(&server)
            .await;

        let detail = client(&server, Some("secret"))
            .get_test(TEST_ID.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(detail.questions[0].text, "2 + 2 = ?");
        assert_eq!(detail.questions[0].correct_answer, 1);
    }

    #[tokio::test]
    async fn missing_test_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_test(TEST_ID.parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/attempts/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server, None).list_attempts().await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_detail_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/mocktests/{TEST_ID}/")))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\": 7}"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .get_test(TEST_ID.parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn submit_posts_payload_and_parses_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/mocktests/{TEST_ID}/submit/")))
            .and(body_partial_json(serde_json::json!({ "score": 100, "timeTaken": 42 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "score": 100,
                "correctAnswers": 1,
                "totalQuestions": 1,
                "timeTaken": 42,
                "breakdown": [{
                    "question": "2 + 2 = ?",
                    "userAnswer": 1,
                    "correctAnswer": 1,
                    "isCorrect": true,
                    "explanation": "arithmetic"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let q1 = Q1.parse().unwrap();
        let payload = SubmitPayload {
            answers: BTreeMap::from([(q1, 1)]),
            time_taken: 42,
            score: 100,
            flags: Vec::new(),
            review: Vec::new(),
            notes: BTreeMap::new(),
            eliminated: BTreeMap::new(),
        };
        let ack = client(&server, None)
            .submit(TEST_ID.parse().unwrap(), &payload)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ack.correct_answers, 1);
        assert!(ack.breakdown[0].is_correct);
    }

    #[tokio::test]
    async fn submit_without_evaluation_body_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let payload = SubmitPayload {
            answers: BTreeMap::new(),
            time_taken: 0,
            score: 0,
            flags: Vec::new(),
            review: Vec::new(),
            notes: BTreeMap::new(),
            eliminated: BTreeMap::new(),
        };
        let ack = client(&server, None)
            .submit(TEST_ID.parse().unwrap(), &payload)
            .await
            .unwrap();
        assert!(ack.is_none());
    }

    #[tokio::test]
    async fn save_progress_uses_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("/mocktests/{TEST_ID}/progress/")))
            .and(body_partial_json(serde_json::json!({ "timeRemaining": 120, "currentQuestionIndex": 0 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let payload = ProgressPayload {
            answers: BTreeMap::new(),
            time_remaining: 120,
            current_question_index: 0,
            flags: Vec::new(),
            review: Vec::new(),
            notes: BTreeMap::new(),
            eliminated: BTreeMap::new(),
        };
        client(&server, None)
            .save_progress(TEST_ID.parse().unwrap(), &payload)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn my_progress_reads_overview() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/progress/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalAttempts": 2,
                "averageScore": 75.0,
                "bySubject": [{ "subject": "Math", "attempts": 2, "averageScore": 75.0 }],
                "recent": [{
                    "id": "6f1c2d3e-0000-4000-8000-0000000000f1",
                    "mock_test_id": TEST_ID,
                    "mock_test__title": "Algebra",
                    "mock_test__subject": "Math",
                    "score": 50,
                    "time_taken_seconds": 120,
                    "started_at": "2026-01-01T10:00:00Z"
                }]
            })))
            .mount(&server)
            .await;

        let overview = client(&server, None).my_progress().await.unwrap();
        assert_eq!(overview.total_attempts, 2);
        assert_eq!(overview.recent[0].title, "Algebra");
    }
}
