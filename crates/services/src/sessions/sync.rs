use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use exam_core::model::TestId;

use crate::api::{MockTestApi, ProgressPayload};

/// Debounced, best-effort push of in-progress state to the server.
///
/// Every `schedule` replaces the pending push, so a burst of edits results in
/// one request after the quiet period. Failures are logged and dropped.
pub(crate) struct ProgressSync {
    api: Arc<dyn MockTestApi>,
    debounce: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ProgressSync {
    pub(crate) fn new(api: Arc<dyn MockTestApi>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            pending: None,
        }
    }

    pub(crate) fn schedule(&mut self, test_id: TestId, payload: ProgressPayload) {
        self.cancel();
        let api = Arc::clone(&self.api);
        let debounce = self.debounce;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            match api.save_progress(test_id, &payload).await {
                Ok(()) => tracing::debug!(test = %test_id, "progress synced"),
                Err(err) => tracing::debug!(test = %test_id, error = %err, "progress sync failed"),
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ProgressSync {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryApi;
    use std::collections::BTreeMap;

    fn payload(remaining: u32) -> ProgressPayload {
        ProgressPayload {
            answers: BTreeMap::new(),
            time_remaining: remaining,
            current_question_index: 0,
            flags: Vec::new(),
            review: Vec::new(),
            notes: BTreeMap::new(),
            eliminated: BTreeMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_coalesce_into_last_payload() {
        let api = InMemoryApi::new();
        let mut sync = ProgressSync::new(Arc::new(api.clone()), Duration::from_millis(400));
        let id = TestId::random();

        sync.schedule(id, payload(30));
        tokio::time::sleep(Duration::from_millis(100)).await;
        sync.schedule(id, payload(29));
        sync.schedule(id, payload(28));
        tokio::time::sleep(Duration::from_millis(399)).await;
        assert!(api.progress_pushes().is_empty());

        tokio::time::sleep(Duration::from_millis(10)).await;
        let pushes = api.progress_pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].1.time_remaining, 28);
        assert!(!sync.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_push() {
        let api = InMemoryApi::new();
        let mut sync = ProgressSync::new(Arc::new(api.clone()), Duration::from_millis(400));
        sync.schedule(TestId::random(), payload(10));
        sync.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(api.progress_pushes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_swallowed() {
        let api = InMemoryApi::new();
        api.set_fail_progress(true);
        let mut sync = ProgressSync::new(Arc::new(api.clone()), Duration::from_millis(50));
        sync.schedule(TestId::random(), payload(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sync.is_pending());
        assert!(api.progress_pushes().is_empty());
    }
}
