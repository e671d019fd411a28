use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use exam_core::keyboard::{FocusTarget, Key, KeyEvent, Modifiers};
use exam_core::model::{Difficulty, MockTestDetail, MockTestSummary, Question, QuestionId, TestId};
use exam_core::time::fixed_clock;
use services::{
    InMemoryApi, ResumeChoice, SessionConfig, SessionController, SessionNotice, SessionPhase,
    SubmitStatus,
};
use storage::repository::{InMemoryRepository, SnapshotRecord, SnapshotRepository, Storage};

fn mock_test(questions: usize, minutes: u32) -> MockTestDetail {
    MockTestDetail {
        summary: MockTestSummary {
            id: TestId::random(),
            title: "Biology mock".into(),
            subject: "Biology".into(),
            duration: minutes,
            total_questions: questions,
            difficulty: Difficulty::Medium,
            topics: vec!["cells".into()],
            description: "Practice paper".into(),
            attempts: 0,
            average_score: 0.0,
        },
        questions: (0..questions)
            .map(|i| Question {
                id: QuestionId::random(),
                text: format!("Question {i}"),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_answer: i % 4,
                explanation: format!("Explanation {i}"),
                difficulty: Difficulty::Medium,
                subject: "Biology".into(),
                topic: "cells".into(),
            })
            .collect(),
    }
}

fn quiet_config() -> SessionConfig {
    SessionConfig {
        auto_advance: false,
        ..SessionConfig::default()
    }
}

fn controller(
    api: &InMemoryApi,
    repo: Arc<dyn SnapshotRepository>,
    config: SessionConfig,
) -> SessionController {
    SessionController::new(Arc::new(api.clone()), repo, fixed_clock(), config)
}

async fn settle(controller: &mut SessionController) -> Vec<SessionNotice> {
    let mut notices = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(10), controller.next_event()).await
    {
        notices.extend(controller.handle_event(event).await);
    }
    notices
}

fn key(c: char) -> KeyEvent {
    KeyEvent::new(Key::Char(c))
}

#[tokio::test(start_paused = true)]
async fn full_session_scores_locally_and_clears_snapshot() {
    let test = mock_test(4, 10);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());
    let mut ctrl = controller(&api, repo.clone(), quiet_config());

    let catalog = ctrl.load_catalog().await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].total_questions, 4);

    ctrl.select_test(test.id());
    assert_eq!(ctrl.phase(), SessionPhase::Loading);
    assert_eq!(
        settle(&mut ctrl).await,
        vec![SessionNotice::Started { resumed: false }]
    );

    // Q0 correct (A), flag it, move on
    ctrl.handle_key(&key('1')).await.unwrap();
    ctrl.handle_key(&key('f')).await.unwrap();
    ctrl.handle_key(&key('n')).await.unwrap();
    // Q1 wrong (C), strike D, mark for review
    ctrl.handle_key(&key('3')).await.unwrap();
    ctrl.handle_key(&KeyEvent::new(Key::Char('4')).with_modifiers(Modifiers::ALT))
        .await
        .unwrap();
    ctrl.handle_key(&key('R')).await.unwrap();
    ctrl.set_note(test.questions[1].id, "revisit osmosis")
        .await
        .unwrap();
    // typing into the note field must not answer anything
    ctrl.handle_key(&key('2').with_focus(FocusTarget::TextInput))
        .await
        .unwrap();
    ctrl.handle_key(&key('n')).await.unwrap();
    // Q2 correct (C)
    ctrl.handle_key(&key('3')).await.unwrap();

    let progress = ctrl.progress().unwrap();
    assert_eq!(progress.answered, 3);
    assert_eq!(progress.flagged, 1);
    assert_eq!(progress.review, 1);
    assert_eq!(progress.current_index, 2);

    let status = ctrl.submit(false).await.unwrap();
    assert_eq!(status, SubmitStatus::NeedsConfirmation { unanswered: 1 });
    let SubmitStatus::Submitted(outcome) = ctrl.confirm_submit(true).await.unwrap() else {
        panic!("expected submission");
    };

    assert_eq!(ctrl.phase(), SessionPhase::Results);
    assert_eq!(outcome.result.correct_answers, 2);
    assert_eq!(outcome.result.score, 50);
    assert!(outcome.result.breakdown[0].flagged);
    assert!(outcome.result.breakdown[1].marked_for_review);
    assert_eq!(
        outcome.result.breakdown[1].note.as_deref(),
        Some("revisit osmosis")
    );
    assert_eq!(outcome.server_ack.as_ref().map(|a| a.score), Some(50));
    assert!(outcome.is_synced());

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    let payload = &submissions[0].1;
    assert_eq!(payload.score, 50);
    assert_eq!(payload.flags, vec![test.questions[0].id]);
    assert_eq!(payload.eliminated[&test.questions[1].id], vec![3]);
    assert!(repo.load_snapshot(test.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn crash_and_resume_restores_identical_state() {
    let test = mock_test(3, 15);
    let api = InMemoryApi::new().with_test(test.clone());
    let storage = Storage::sqlite("sqlite:file:session_flow_resume?mode=memory&cache=shared")
        .await
        .unwrap();

    let before = {
        let mut ctrl = controller(&api, storage.snapshots.clone(), quiet_config());
        ctrl.select_test(test.id());
        assert_eq!(
            ctrl.pump().await,
            Some(SessionNotice::Started { resumed: false })
        );
        ctrl.select_answer(test.questions[0].id, 2).await.unwrap();
        ctrl.toggle_flag(test.questions[2].id).await.unwrap();
        ctrl.toggle_eliminate(test.questions[1].id, 0).await.unwrap();
        ctrl.set_note(test.questions[1].id, "units?").await.unwrap();
        ctrl.jump_to(1).await.unwrap();
        ctrl.state().cloned().unwrap()
    };

    let mut ctrl = controller(&api, storage.snapshots.clone(), quiet_config());
    assert_eq!(ctrl.resumable_tests().await.unwrap(), vec![test.id()]);
    ctrl.select_test(test.id());
    assert_eq!(
        ctrl.pump().await,
        Some(SessionNotice::ResumeAvailable {
            test_id: test.id(),
            answered: 1,
            time_remaining_seconds: before.time_remaining_seconds(),
        })
    );
    assert_eq!(ctrl.phase(), SessionPhase::ResumePrompt);

    let notice = ctrl.resolve_resume(ResumeChoice::Resume).await.unwrap();
    assert_eq!(notice, SessionNotice::Started { resumed: true });
    assert_eq!(ctrl.state(), Some(&before));
    assert_eq!(ctrl.phase(), SessionPhase::Active);
}

#[tokio::test(start_paused = true)]
async fn discarding_a_snapshot_starts_fresh() {
    let test = mock_test(2, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());

    {
        let mut ctrl = controller(&api, repo.clone(), quiet_config());
        ctrl.select_test(test.id());
        settle(&mut ctrl).await;
        ctrl.select_answer(test.questions[0].id, 1).await.unwrap();
    }

    let mut ctrl = controller(&api, repo.clone(), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;
    let notice = ctrl.resolve_resume(ResumeChoice::Discard).await.unwrap();
    assert_eq!(notice, SessionNotice::Started { resumed: false });
    let state = ctrl.state().unwrap();
    assert_eq!(state.answered_count(), 0);
    assert_eq!(state.time_remaining_seconds(), 300);
}

#[tokio::test(start_paused = true)]
async fn corrupt_snapshot_is_treated_as_absent() {
    let test = mock_test(2, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());
    repo.save_snapshot(&SnapshotRecord {
        test_id: test.id(),
        payload: "\u{0}garbage".into(),
        saved_at: Utc::now(),
        pending_submit: None,
    })
    .await
    .unwrap();

    let mut ctrl = controller(&api, repo.clone(), quiet_config());
    ctrl.select_test(test.id());
    assert_eq!(
        settle(&mut ctrl).await,
        vec![SessionNotice::Started { resumed: false }]
    );
    let saved = repo.load_snapshot(test.id()).await.unwrap().unwrap();
    assert!(saved.decode().is_ok());
}

#[tokio::test(start_paused = true)]
async fn time_expiry_submits_exactly_once() {
    let test = mock_test(2, 1);
    let api = InMemoryApi::new().with_test(test.clone());
    let mut ctrl = controller(&api, Arc::new(InMemoryRepository::new()), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;
    ctrl.select_answer(test.questions[0].id, 0).await.unwrap();

    let mut ticks = 0;
    loop {
        match ctrl.pump().await {
            Some(SessionNotice::Ticked { .. }) => ticks += 1,
            Some(SessionNotice::Submitted { timed_out }) => {
                assert!(timed_out);
                break;
            }
            _ => {}
        }
    }
    assert_eq!(ticks, 59);
    assert_eq!(ctrl.phase(), SessionPhase::Results);
    let outcome = ctrl.outcome().unwrap();
    assert_eq!(outcome.result.time_taken_seconds, 60);
    assert_eq!(outcome.result.score, 50);

    assert_eq!(
        ctrl.submit(true).await.unwrap(),
        SubmitStatus::AlreadySubmitted
    );
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(settle(&mut ctrl).await.is_empty());
    assert_eq!(api.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_submit_in_final_tick_wins_once() {
    let test = mock_test(1, 1);
    let api = InMemoryApi::new().with_test(test.clone());
    let mut ctrl = controller(&api, Arc::new(InMemoryRepository::new()), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;

    while ctrl.pump().await != Some(SessionNotice::Ticked { remaining: 1 }) {}
    // the last tick is due but not yet handled
    tokio::time::advance(Duration::from_secs(1)).await;
    tokio::task::yield_now().await;

    assert!(matches!(
        ctrl.submit(true).await.unwrap(),
        SubmitStatus::Submitted(_)
    ));
    assert!(settle(&mut ctrl).await.is_empty());
    assert_eq!(api.submissions().len(), 1);
    assert_eq!(ctrl.phase(), SessionPhase::Results);
}

#[tokio::test(start_paused = true)]
async fn failed_submit_keeps_result_and_snapshot_until_retry() {
    let test = mock_test(2, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());
    let mut ctrl = controller(&api, repo.clone(), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;
    ctrl.select_answer(test.questions[0].id, 0).await.unwrap();
    ctrl.select_answer(test.questions[1].id, 1).await.unwrap();

    api.set_fail_submit(true);
    let SubmitStatus::Submitted(outcome) = ctrl.submit(false).await.unwrap() else {
        panic!("expected local result");
    };
    assert_eq!(outcome.result.score, 100);
    assert!(outcome.sync_warning.is_some());
    assert_eq!(ctrl.phase(), SessionPhase::Results);
    assert!(ctrl.has_pending_retry());
    let kept = repo.load_snapshot(test.id()).await.unwrap().unwrap();
    assert!(kept.is_submitted());

    assert!(ctrl.retry_submit().await.is_err());
    assert!(ctrl.has_pending_retry());

    api.set_fail_submit(false);
    let outcome = ctrl.retry_submit().await.unwrap();
    assert!(outcome.is_synced());
    assert_eq!(outcome.server_ack.map(|a| a.score), Some(100));
    assert!(!ctrl.has_pending_retry());
    assert!(repo.load_snapshot(test.id()).await.unwrap().is_none());
    assert_eq!(api.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unsent_submission_reopens_on_results_after_restart() {
    let test = mock_test(2, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());

    let mut first = controller(&api, repo.clone(), quiet_config());
    first.select_test(test.id());
    settle(&mut first).await;
    first.select_answer(test.questions[0].id, 2).await.unwrap();
    first.select_answer(test.questions[1].id, 2).await.unwrap();
    api.set_fail_submit(true);
    let SubmitStatus::Submitted(original) = first.submit(true).await.unwrap() else {
        panic!("expected local result");
    };
    assert_eq!(original.result.score, 0);
    first.leave_session();
    drop(first);

    let mut second = controller(&api, repo.clone(), quiet_config());
    second.select_test(test.id());
    assert_eq!(
        settle(&mut second).await,
        vec![SessionNotice::SubmissionPending {
            test_id: test.id(),
            score: 0,
        }]
    );
    assert_eq!(second.phase(), SessionPhase::Results);
    assert!(second.has_pending_retry());
    assert_eq!(second.outcome().map(|o| &o.result), Some(&original.result));

    // the scored attempt cannot be reopened or changed
    assert!(second.resolve_resume(ResumeChoice::Resume).await.is_err());
    assert!(
        second
            .select_answer(test.questions[0].id, 0)
            .await
            .is_err()
    );
    assert_eq!(second.submit(true).await.unwrap(), SubmitStatus::AlreadySubmitted);

    api.set_fail_submit(false);
    let outcome = second.retry_submit().await.unwrap();
    assert!(outcome.is_synced());
    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    let (sent_to, payload) = &submissions[0];
    assert_eq!(*sent_to, test.id());
    assert_eq!(payload.score, 0);
    assert_eq!(payload.answers[&test.questions[0].id], 2);
    assert_eq!(payload.answers[&test.questions[1].id], 2);
    assert!(repo.load_snapshot(test.id()).await.unwrap().is_none());

    // with the submission recorded the test starts over
    second.select_test(test.id());
    assert_eq!(
        settle(&mut second).await,
        vec![SessionNotice::Started { resumed: false }]
    );
}

#[tokio::test(start_paused = true)]
async fn resuming_an_expired_snapshot_submits_immediately() {
    let test = mock_test(1, 1);
    let api = InMemoryApi::new().with_test(test.clone());
    let repo = Arc::new(InMemoryRepository::new());

    {
        let mut ctrl = controller(&api, repo.clone(), quiet_config());
        ctrl.select_test(test.id());
        settle(&mut ctrl).await;
        api.set_fail_submit(true);
        while ctrl.pump().await != Some(SessionNotice::Submitted { timed_out: true }) {}
        assert!(ctrl.has_pending_retry());
    }

    api.set_fail_submit(false);
    let mut ctrl = controller(&api, repo.clone(), quiet_config());
    ctrl.select_test(test.id());
    let notices = settle(&mut ctrl).await;
    assert!(matches!(
        notices.as_slice(),
        [SessionNotice::ResumeAvailable {
            time_remaining_seconds: 0,
            ..
        }]
    ));
    let notice = ctrl.resolve_resume(ResumeChoice::Resume).await.unwrap();
    assert_eq!(notice, SessionNotice::Submitted { timed_out: true });
    assert_eq!(api.submissions().len(), 1);
    assert!(repo.load_snapshot(test.id()).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn edits_are_pushed_once_after_quiet_period() {
    let test = mock_test(3, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    let mut ctrl = controller(&api, Arc::new(InMemoryRepository::new()), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;

    ctrl.select_answer(test.questions[0].id, 1).await.unwrap();
    ctrl.toggle_flag(test.questions[0].id).await.unwrap();
    ctrl.jump_to(2).await.unwrap();
    assert!(api.progress_pushes().is_empty());

    tokio::time::sleep(Duration::from_millis(450)).await;
    let pushes = api.progress_pushes();
    assert_eq!(pushes.len(), 1);
    let (id, payload) = &pushes[0];
    assert_eq!(*id, test.id());
    assert_eq!(payload.current_question_index, 2);
    assert_eq!(payload.flags, vec![test.questions[0].id]);
}

#[tokio::test(start_paused = true)]
async fn failing_autosave_never_interrupts_the_session() {
    let test = mock_test(2, 5);
    let api = InMemoryApi::new().with_test(test.clone());
    api.set_fail_progress(true);
    let mut ctrl = controller(&api, Arc::new(InMemoryRepository::new()), quiet_config());
    ctrl.select_test(test.id());
    settle(&mut ctrl).await;

    ctrl.select_answer(test.questions[0].id, 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    ctrl.select_answer(test.questions[1].id, 1).await.unwrap();
    assert_eq!(ctrl.phase(), SessionPhase::Active);
    assert_eq!(ctrl.state().unwrap().answered_count(), 2);
}
