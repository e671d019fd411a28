use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use exam_core::keyboard::{map_key, KeyCommand, KeyEvent};
use exam_core::model::{
    MockTestDetail, MockTestError, MockTestSummary, Question, QuestionId, SessionState, TestId,
};
use exam_core::navigation::{Palette, PaletteFilter};
use exam_core::scoring::score_session;
use exam_core::Clock;
use storage::repository::SnapshotRepository;

use super::events::{
    JumpOutcome, ResumeChoice, SessionEvent, SessionNotice, SubmissionOutcome, SubmitStatus,
};
use super::phase::SessionPhase;
use super::progress::SessionProgress;
use super::snapshots::{PendingSubmission, SnapshotStore, StoredSession};
use super::sync::ProgressSync;
use super::timer::CountdownTimer;
use crate::api::{AttemptAck, MockTestApi, ProgressPayload, SubmitPayload};
use crate::config::SessionConfig;
use crate::error::{ApiError, SessionError};

/// Orchestrates one mock-test session at a time.
///
/// All state changes run on the caller's task: user operations are `&mut self`
/// methods, and background work (detail fetch, countdown, auto-advance) posts
/// `SessionEvent`s that the caller feeds back through [`Self::pump`] or
/// [`Self::handle_event`].
pub struct SessionController {
    api: Arc<dyn MockTestApi>,
    snapshots: SnapshotStore,
    config: SessionConfig,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
    epoch: u64,
    phase: SessionPhase,
    catalog: Vec<MockTestSummary>,
    loading: Option<TestId>,
    detail: Option<MockTestDetail>,
    state: Option<SessionState>,
    pending_resume: Option<SessionState>,
    confirm_return: SessionPhase,
    filter: PaletteFilter,
    timer: CountdownTimer,
    sync: ProgressSync,
    loader: Option<JoinHandle<()>>,
    auto_advance: Option<JoinHandle<()>>,
    outcome: Option<SubmissionOutcome>,
    failed_submit: Option<SubmitPayload>,
}

impl SessionController {
    #[must_use]
    pub fn new(
        api: Arc<dyn MockTestApi>,
        snapshots: Arc<dyn SnapshotRepository>,
        clock: Clock,
        config: SessionConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            sync: ProgressSync::new(Arc::clone(&api), config.autosave_debounce),
            api,
            snapshots: SnapshotStore::new(snapshots, clock),
            config,
            events_tx,
            events_rx,
            epoch: 0,
            phase: SessionPhase::Catalog,
            catalog: Vec::new(),
            loading: None,
            detail: None,
            state: None,
            pending_resume: None,
            confirm_return: SessionPhase::Active,
            filter: PaletteFilter::All,
            timer: CountdownTimer::new(),
            loader: None,
            auto_advance: None,
            outcome: None,
            failed_submit: None,
        }
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn catalog(&self) -> &[MockTestSummary] {
        &self.catalog
    }

    #[must_use]
    pub fn detail(&self) -> Option<&MockTestDetail> {
        self.detail.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> PaletteFilter {
        self.filter
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        self.outcome.as_ref()
    }

    /// Whether a failed remote submission is waiting for `retry_submit`.
    #[must_use]
    pub fn has_pending_retry(&self) -> bool {
        self.failed_submit.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        let state = self.state.as_ref()?;
        self.detail
            .as_ref()?
            .question_at(state.current_question_index())
    }

    #[must_use]
    pub fn palette(&self) -> Option<Palette<'_>> {
        Some(Palette::new(self.detail.as_ref()?, self.state.as_ref()?))
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        Some(SessionProgress::new(
            self.detail.as_ref()?,
            self.state.as_ref()?,
            self.phase,
            self.filter,
        ))
    }

    // ─── Catalog ──────────────────────────────────────────────────────────────

    /// Fetch the list of available tests.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the catalog cannot be fetched.
    pub async fn load_catalog(&mut self) -> Result<&[MockTestSummary], SessionError> {
        self.catalog = self.api.list_tests().await?;
        tracing::debug!(count = self.catalog.len(), "catalog loaded");
        Ok(&self.catalog)
    }

    /// Tests with a stored snapshot that can be resumed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on persistence failures.
    pub async fn resumable_tests(&self) -> Result<Vec<TestId>, SessionError> {
        Ok(self.snapshots.list().await?)
    }

    /// Start loading `test_id`. Any running session is torn down first; its
    /// snapshot is kept so it can be resumed later.
    ///
    /// The outcome arrives as a `DetailLoaded` event.
    pub fn select_test(&mut self, test_id: TestId) {
        self.teardown();
        self.set_phase(SessionPhase::Loading);
        self.loading = Some(test_id);

        let api = Arc::clone(&self.api);
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        self.loader = Some(tokio::spawn(async move {
            let result = api.get_test(test_id).await;
            let _ = events.send(SessionEvent::DetailLoaded {
                epoch,
                test_id,
                result: Box::new(result),
            });
        }));
    }

    /// Answer the resume prompt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `ResumePrompt`.
    pub async fn resolve_resume(
        &mut self,
        choice: ResumeChoice,
    ) -> Result<SessionNotice, SessionError> {
        self.require(SessionPhase::ResumePrompt)?;
        let detail = self.detail.as_ref().ok_or(SessionError::NoSession)?;
        let test_id = detail.id();

        match choice {
            ResumeChoice::Resume => {
                let state = self.pending_resume.take().ok_or(SessionError::NoSession)?;
                let expired = state.time_remaining_seconds() == 0;
                self.state = Some(state);
                self.begin(true);
                if expired {
                    self.finalize().await?;
                    return Ok(SessionNotice::Submitted { timed_out: true });
                }
                Ok(SessionNotice::Started { resumed: true })
            }
            ResumeChoice::Discard => {
                self.pending_resume = None;
                if let Err(err) = self.snapshots.clear(test_id).await {
                    tracing::warn!(test = %test_id, error = %err, "failed to discard snapshot");
                }
                self.start_fresh().await;
                Ok(SessionNotice::Started { resumed: false })
            }
        }
    }

    // ─── Events ───────────────────────────────────────────────────────────────

    /// Wait for the next background event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Wait for the next background event and apply it.
    pub async fn pump(&mut self) -> Option<SessionNotice> {
        let event = self.next_event().await?;
        self.handle_event(event).await
    }

    /// Apply one background event. Events from an older session are ignored.
    pub async fn handle_event(&mut self, event: SessionEvent) -> Option<SessionNotice> {
        match event {
            SessionEvent::DetailLoaded {
                epoch,
                test_id,
                result,
            } => {
                if epoch != self.epoch
                    || self.phase != SessionPhase::Loading
                    || self.loading != Some(test_id)
                {
                    tracing::debug!(test = %test_id, "dropping stale detail load");
                    return None;
                }
                self.loader = None;
                Some(self.on_detail_loaded(test_id, *result).await)
            }
            SessionEvent::Tick { epoch, run } => {
                if epoch != self.epoch || !self.timer.is_current(run) || !self.phase.accepts_ticks()
                {
                    return None;
                }
                self.on_tick().await
            }
            SessionEvent::AutoAdvance { epoch, from } => {
                if epoch != self.epoch || self.phase != SessionPhase::Active {
                    return None;
                }
                self.auto_advance = None;
                self.on_auto_advance(from).await
            }
        }
    }

    async fn on_detail_loaded(
        &mut self,
        test_id: TestId,
        result: Result<MockTestDetail, ApiError>,
    ) -> SessionNotice {
        let detail = match result {
            Ok(detail) => detail,
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "failed to load mock test");
                self.teardown();
                return SessionNotice::LoadFailed(err.to_string());
            }
        };
        if detail.id() != test_id {
            self.teardown();
            return SessionNotice::LoadFailed(format!(
                "requested {test_id} but received {}",
                detail.id()
            ));
        }
        match detail.validate() {
            Ok(()) => {}
            Err(MockTestError::NoQuestions) => {
                tracing::warn!(test = %test_id, "mock test has no questions");
                self.teardown();
                return SessionNotice::EmptyTest;
            }
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "mock test failed validation");
                self.teardown();
                return SessionNotice::LoadFailed(err.to_string());
            }
        }

        let snapshot = match self.snapshots.load(&detail).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "snapshot lookup failed");
                None
            }
        };
        self.loading = None;
        self.detail = Some(detail);

        match snapshot {
            Some(StoredSession::AwaitingSubmit { state, submission }) => {
                // already scored: only the submission itself may be re-sent
                tracing::info!(test = %test_id, score = submission.result.score, "found unsent submission");
                let notice = SessionNotice::SubmissionPending {
                    test_id,
                    score: submission.result.score,
                };
                self.state = Some(state);
                self.failed_submit = Some(submission.payload);
                self.outcome = Some(SubmissionOutcome {
                    result: submission.result,
                    server_ack: None,
                    sync_warning: Some(UNSENT_SUBMISSION.to_string()),
                });
                self.set_phase(SessionPhase::Results);
                notice
            }
            Some(StoredSession::InProgress(state)) => {
                let notice = SessionNotice::ResumeAvailable {
                    test_id,
                    answered: state.answered_count(),
                    time_remaining_seconds: state.time_remaining_seconds(),
                };
                self.pending_resume = Some(state);
                self.set_phase(SessionPhase::ResumePrompt);
                notice
            }
            None => {
                self.start_fresh().await;
                SessionNotice::Started { resumed: false }
            }
        }
    }

    async fn on_tick(&mut self) -> Option<SessionNotice> {
        let remaining = self.state.as_mut()?.tick();
        self.persist().await;
        if remaining > 0 {
            return Some(SessionNotice::Ticked { remaining });
        }

        tracing::info!("time expired");
        self.timer.stop();
        match self.finalize().await {
            Ok(_) => Some(SessionNotice::Submitted { timed_out: true }),
            Err(err) => {
                tracing::warn!(error = %err, "automatic submission failed");
                None
            }
        }
    }

    async fn on_auto_advance(&mut self, from: usize) -> Option<SessionNotice> {
        let detail = self.detail.as_ref()?;
        let state = self.state.as_mut()?;
        // the user may have moved on already
        if state.current_question_index() != from || from + 1 >= detail.total_questions() {
            return None;
        }
        state.set_current_index(detail, from + 1).ok()?;
        self.commit().await;
        Some(SessionNotice::Advanced { index: from + 1 })
    }

    // ─── Mutations ────────────────────────────────────────────────────────────

    /// Record an answer. With auto-advance on and `question` current, the
    /// cursor moves on after a short delay.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an invalid question/option.
    pub async fn select_answer(
        &mut self,
        question: QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        let (detail, state) = self.active_session()?;
        state.select_answer(detail, question, option)?;
        let current = state.current_question_index();
        let advance = state.auto_advance()
            && detail.index_of(question) == Some(current)
            && current + 1 < detail.total_questions();
        self.commit().await;
        if advance {
            self.schedule_auto_advance(current);
        }
        Ok(())
    }

    /// Remove the answer for `question`. Returns whether one was present.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an unknown question.
    pub async fn clear_answer(&mut self, question: QuestionId) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let removed = state.clear_answer(detail, question)?;
        self.commit().await;
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an unknown question.
    pub async fn toggle_flag(&mut self, question: QuestionId) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let flagged = state.toggle_flag(detail, question)?;
        self.commit().await;
        Ok(flagged)
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an unknown question.
    pub async fn toggle_review(&mut self, question: QuestionId) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let marked = state.toggle_review(detail, question)?;
        self.commit().await;
        Ok(marked)
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an invalid question/option.
    pub async fn toggle_eliminate(
        &mut self,
        question: QuestionId,
        option: usize,
    ) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let eliminated = state.toggle_eliminate(detail, question, option)?;
        self.commit().await;
        Ok(eliminated)
    }

    /// Overwrite the note for `question`; an empty string clears it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an unknown question.
    pub async fn set_note(
        &mut self,
        question: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        let (detail, state) = self.active_session()?;
        state.set_note(detail, question, text)?;
        self.commit().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Active`.
    pub async fn set_auto_advance(&mut self, enabled: bool) -> Result<(), SessionError> {
        let (_, state) = self.active_session()?;
        state.set_auto_advance(enabled);
        self.commit().await;
        Ok(())
    }

    /// Move to the next question. Returns `false` on the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Active`.
    pub async fn next(&mut self) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let Some(index) = Palette::new(detail, state).next_index() else {
            return Ok(false);
        };
        self.jump_to(index).await?;
        Ok(true)
    }

    /// Move to the previous question. Returns `false` on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Active`.
    pub async fn previous(&mut self) -> Result<bool, SessionError> {
        let (detail, state) = self.active_session()?;
        let Some(index) = Palette::new(detail, state).previous_index() else {
            return Ok(false);
        };
        self.jump_to(index).await?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns `SessionError` outside `Active` or for an index past the end.
    pub async fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        let (detail, state) = self.active_session()?;
        state.set_current_index(detail, index)?;
        self.commit().await;
        Ok(())
    }

    /// Move to the lowest-indexed unanswered question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Active`.
    pub async fn jump_to_first_unanswered(&mut self) -> Result<JumpOutcome, SessionError> {
        let (detail, state) = self.active_session()?;
        match Palette::new(detail, state).first_unanswered() {
            Some(index) => {
                self.jump_to(index).await?;
                Ok(JumpOutcome::Moved(index))
            }
            None => Ok(JumpOutcome::AllAnswered),
        }
    }

    /// Change the palette filter. Never moves the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` when no session is loaded.
    pub fn set_filter(&mut self, filter: PaletteFilter) -> Result<(), SessionError> {
        if self.state.is_none() {
            return Err(SessionError::NoSession);
        }
        self.filter = filter;
        Ok(())
    }

    /// Apply a key press to the current question.
    ///
    /// Keys are ignored outside `Active` and while a text field has focus.
    /// Returns the command that was applied.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the mapped command is rejected.
    pub async fn handle_key(&mut self, event: &KeyEvent) -> Result<Option<KeyCommand>, SessionError> {
        if self.phase != SessionPhase::Active {
            return Ok(None);
        }
        let Some(question) = self.current_question() else {
            return Ok(None);
        };
        let question_id = question.id;
        let Some(command) = map_key(event, question.option_count()) else {
            return Ok(None);
        };

        match command {
            KeyCommand::SelectOption(option) => self.select_answer(question_id, option).await?,
            KeyCommand::ToggleEliminate(option) => {
                self.toggle_eliminate(question_id, option).await?;
            }
            KeyCommand::Next => {
                self.next().await?;
            }
            KeyCommand::Previous => {
                self.previous().await?;
            }
            KeyCommand::ToggleFlag => {
                self.toggle_flag(question_id).await?;
            }
            KeyCommand::ToggleReview => {
                self.toggle_review(question_id).await?;
            }
            KeyCommand::ClearAnswer => {
                self.clear_answer(question_id).await?;
            }
        }
        Ok(Some(command))
    }

    // ─── Pause / resume ───────────────────────────────────────────────────────

    /// Freeze the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Active`.
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.require(SessionPhase::Active)?;
        self.timer.stop();
        self.cancel_auto_advance();
        self.set_phase(SessionPhase::Paused);
        self.persist().await;
        Ok(())
    }

    /// Restart the countdown from the frozen value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `Paused`.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require(SessionPhase::Paused)?;
        self.set_phase(SessionPhase::Active);
        self.timer.start(self.epoch, self.events_tx.clone());
        Ok(())
    }

    // ─── Submission ───────────────────────────────────────────────────────────

    /// Submit the session.
    ///
    /// Without `force`, unanswered questions move the session to
    /// `ConfirmSubmit` and nothing is scored yet. Calling again after the
    /// session was submitted is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` when no session is running.
    pub async fn submit(&mut self, force: bool) -> Result<SubmitStatus, SessionError> {
        if self.phase.is_submitted() {
            return Ok(SubmitStatus::AlreadySubmitted);
        }
        if !self.phase.is_running() {
            return Err(SessionError::InvalidPhase(self.phase));
        }

        if !force {
            let unanswered = self
                .palette()
                .map_or(0, |palette| palette.counts().unanswered);
            if unanswered > 0 {
                if self.phase != SessionPhase::ConfirmSubmit {
                    self.confirm_return = self.phase;
                    self.set_phase(SessionPhase::ConfirmSubmit);
                }
                return Ok(SubmitStatus::NeedsConfirmation { unanswered });
            }
        }

        let outcome = self.finalize().await?;
        Ok(SubmitStatus::Submitted(outcome))
    }

    /// Answer the submit confirmation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `ConfirmSubmit`.
    pub async fn confirm_submit(&mut self, confirmed: bool) -> Result<SubmitStatus, SessionError> {
        if self.phase.is_submitted() {
            return Ok(SubmitStatus::AlreadySubmitted);
        }
        self.require(SessionPhase::ConfirmSubmit)?;
        if confirmed {
            let outcome = self.finalize().await?;
            return Ok(SubmitStatus::Submitted(outcome));
        }
        self.set_phase(self.confirm_return);
        Ok(SubmitStatus::Cancelled)
    }

    /// Re-send a submission whose network call failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` without a failed submission, or
    /// `SessionError::Api` if the retry fails as well.
    pub async fn retry_submit(&mut self) -> Result<SubmissionOutcome, SessionError> {
        self.require(SessionPhase::Results)?;
        let payload = self
            .failed_submit
            .as_ref()
            .ok_or(SessionError::NothingToRetry)?;
        let test_id = self
            .outcome
            .as_ref()
            .map(|o| o.result.test_id)
            .ok_or(SessionError::NoSession)?;

        match self.api.submit(test_id, payload).await {
            Ok(ack) => {
                self.failed_submit = None;
                self.state = None;
                if let Err(err) = self.snapshots.clear(test_id).await {
                    tracing::warn!(test = %test_id, error = %err, "failed to clear snapshot");
                }
                let outcome = self.outcome.as_mut().ok_or(SessionError::NoSession)?;
                check_ack(outcome.result.score, ack.as_ref());
                outcome.server_ack = ack;
                outcome.sync_warning = None;
                tracing::info!(test = %test_id, "submission retried");
                Ok(outcome.clone())
            }
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "submission retry failed");
                if let Some(outcome) = self.outcome.as_mut() {
                    outcome.sync_warning = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    async fn finalize(&mut self) -> Result<SubmissionOutcome, SessionError> {
        self.timer.stop();
        self.sync.cancel();
        self.cancel_auto_advance();
        self.set_phase(SessionPhase::Submitting);

        let (Some(detail), Some(state)) = (self.detail.as_ref(), self.state.as_ref()) else {
            return Err(SessionError::NoSession);
        };
        let test_id = detail.id();
        let result = score_session(detail, state);
        let payload = SubmitPayload::new(state, &result);

        let outcome = match self.api.submit(test_id, &payload).await {
            Ok(ack) => {
                check_ack(result.score, ack.as_ref());
                if let Err(err) = self.snapshots.clear(test_id).await {
                    tracing::warn!(test = %test_id, error = %err, "failed to clear snapshot");
                }
                self.state = None;
                SubmissionOutcome {
                    result,
                    server_ack: ack,
                    sync_warning: None,
                }
            }
            Err(err) => {
                tracing::warn!(test = %test_id, error = %err, "submission failed");
                let submission = PendingSubmission { result, payload };
                if let Err(err) = self.snapshots.save_submitted(state, &submission).await {
                    tracing::warn!(test = %test_id, error = %err, "failed to persist unsent submission");
                }
                self.failed_submit = Some(submission.payload);
                SubmissionOutcome {
                    result: submission.result,
                    server_ack: None,
                    sync_warning: Some(err.to_string()),
                }
            }
        };

        tracing::info!(
            test = %test_id,
            score = outcome.result.score,
            correct = outcome.result.correct_answers,
            total = outcome.result.total_questions,
            "session submitted"
        );
        self.outcome = Some(outcome.clone());
        self.set_phase(SessionPhase::Results);
        Ok(outcome)
    }

    // ─── Teardown ─────────────────────────────────────────────────────────────

    /// Abandon the current session from any phase and delete its snapshot.
    pub async fn reset(&mut self) {
        let test_id = self
            .detail
            .as_ref()
            .map(MockTestDetail::id)
            .or(self.loading);
        self.teardown();
        if let Some(test_id) = test_id {
            if let Err(err) = self.snapshots.clear(test_id).await {
                tracing::warn!(test = %test_id, error = %err, "failed to clear snapshot");
            }
        }
    }

    /// Return to the catalog, keeping any snapshot for a later resume.
    pub fn leave_session(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.timer.stop();
        self.sync.cancel();
        self.cancel_auto_advance();
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        self.loading = None;
        self.detail = None;
        self.state = None;
        self.pending_resume = None;
        self.confirm_return = SessionPhase::Active;
        self.filter = PaletteFilter::All;
        self.outcome = None;
        self.failed_submit = None;
        self.set_phase(SessionPhase::Catalog);
    }

    // ─── Internals ────────────────────────────────────────────────────────────

    async fn start_fresh(&mut self) {
        let Some(detail) = self.detail.as_ref() else {
            return;
        };
        self.state = Some(SessionState::fresh(detail, self.config.auto_advance));
        self.persist().await;
        self.begin(false);
    }

    fn begin(&mut self, resumed: bool) {
        self.set_phase(SessionPhase::Active);
        self.timer.start(self.epoch, self.events_tx.clone());
        if let Some(detail) = self.detail.as_ref() {
            tracing::info!(test = %detail.id(), title = %detail.summary.title, resumed, "session started");
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "phase change");
            self.phase = phase;
        }
    }

    fn require(&self, phase: SessionPhase) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidPhase(self.phase))
        }
    }

    fn active_session(&mut self) -> Result<(&MockTestDetail, &mut SessionState), SessionError> {
        self.require(SessionPhase::Active)?;
        match (self.detail.as_ref(), self.state.as_mut()) {
            (Some(detail), Some(state)) => Ok((detail, state)),
            _ => Err(SessionError::NoSession),
        }
    }

    /// Write the state locally. Failures are logged and the session goes on.
    async fn persist(&self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if let Err(err) = self.snapshots.save(state).await {
            tracing::warn!(test = %state.test_id(), error = %err, "failed to persist snapshot");
        }
    }

    /// Persist locally, then queue a debounced remote push.
    async fn commit(&mut self) {
        self.persist().await;
        if let Some(state) = self.state.as_ref() {
            self.sync
                .schedule(state.test_id(), ProgressPayload::from_state(state));
        }
    }

    fn schedule_auto_advance(&mut self, from: usize) {
        self.cancel_auto_advance();
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        let delay = self.config.auto_advance_delay;
        self.auto_advance = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::AutoAdvance { epoch, from });
        }));
    }

    fn cancel_auto_advance(&mut self) {
        if let Some(handle) = self.auto_advance.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel_auto_advance();
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
    }
}

const UNSENT_SUBMISSION: &str = "this attempt was scored but never reached the server";

fn check_ack(local_score: u32, ack: Option<&AttemptAck>) {
    if let Some(ack) = ack {
        if ack.score != local_score {
            tracing::warn!(
                local = local_score,
                server = ack.score,
                "server score differs from local result"
            );
        }
    }
}
