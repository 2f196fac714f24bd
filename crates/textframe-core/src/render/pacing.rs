//! Elapsed-time pacing between render passes.

use std::time::Duration;

use tokio::time::Instant;

use crate::signal::{ShutdownToken, Trigger};

/// Outcome of one synchronization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The full remaining delay elapsed.
    Completed,
    /// The configured interval had already elapsed; no wait was needed.
    NoDelayNeeded,
    /// The abort signal fired during the wait.
    Aborted,
    /// Shutdown was requested during the wait.
    Cancelled,
}

impl SyncOutcome {
    /// Whether the render pass should stop instead of drawing.
    pub fn is_interrupted(self) -> bool {
        matches!(self, Self::Aborted | Self::Cancelled)
    }
}

/// Paces successive calls to a configured interval.
///
/// Each call waits for whatever remains of the interval since the previous
/// call, so the time spent drawing counts against the budget. Drift is not
/// compensated beyond this single-step accounting. The internal stopwatch
/// restarts unconditionally at the end of every call, whatever the outcome.
#[derive(Debug)]
pub struct IntervalSynchronizer {
    interval: Duration,
    last_restart: Option<Instant>,
}

impl IntervalSynchronizer {
    /// Creates a synchronizer with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_restart: None }
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reconfigures the interval, effective from the next call.
    pub fn set_interval(&mut self, interval: Duration) {
        if self.interval != interval {
            self.interval = interval;
            tracing::debug!(?interval, "synchronizer interval changed");
        }
    }

    /// Waits out the remainder of the interval, abortable and cancellable.
    pub(crate) async fn synchronize(
        &mut self,
        abort: &Trigger,
        shutdown: &ShutdownToken,
    ) -> SyncOutcome {
        // The first call is free so an incoming view draws immediately.
        let elapsed = self.last_restart.map(|at| at.elapsed());
        let outcome = match elapsed.and_then(|elapsed| self.interval.checked_sub(elapsed)) {
            Some(remaining) if remaining > Duration::ZERO => {
                tokio::select! {
                    biased;
                    () = abort.wait() => {
                        tracing::trace!("pacing wait aborted");
                        SyncOutcome::Aborted
                    }
                    () = shutdown.cancelled() => SyncOutcome::Cancelled,
                    () = tokio::time::sleep(remaining) => {
                        tracing::trace!(?remaining, "pacing delayed");
                        SyncOutcome::Completed
                    }
                }
            }
            _ => SyncOutcome::NoDelayNeeded,
        };
        self.last_restart = Some(Instant::now());
        outcome
    }
}
