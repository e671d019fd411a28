use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use super::events::SessionEvent;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One-second countdown ticker.
///
/// Each `start` begins a new run; ticks from earlier runs are recognisable
/// through `is_current` and must be ignored by the receiver.
#[derive(Debug, Default)]
pub(crate) struct CountdownTimer {
    handle: Option<JoinHandle<()>>,
    run: u64,
}

impl CountdownTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&mut self, epoch: u64, events: UnboundedSender<SessionEvent>) {
        self.stop();
        self.run = self.run.wrapping_add(1);
        let run = self.run;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            loop {
                interval.tick().await;
                if events.send(SessionEvent::Tick { epoch, run }).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(epoch, run, "countdown started");
    }

    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(run = self.run, "countdown stopped");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a tick tagged `run` came from the live ticker.
    pub(crate) fn is_current(&self, run: u64) -> bool {
        self.is_running() && self.run == run
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
