//! Async signalling primitives used by the render loop.
//!
//! Three small wrappers over tokio's notification types, each supporting a
//! non-blocking poll and a cancellable blocking wait:
//!
//! - [`Trigger`]: auto-reset, edge-triggered; one `fire` wakes one `wait`.
//! - [`Gate`]: manual-reset level signal; waiters observe set/cleared.
//! - [`ShutdownToken`]: sticky cancellation flag shared across tasks.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::{Notify, watch};

/// Auto-reset signal. A `fire` is consumed by exactly one `take` or `wait`.
#[derive(Debug, Default)]
pub(crate) struct Trigger {
    set: AtomicBool,
    notify: Notify,
}

impl Trigger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fires the trigger, waking one waiter now or the next to arrive.
    pub(crate) fn fire(&self) {
        self.set.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Consumes the trigger if fired. Non-blocking.
    pub(crate) fn take(&self) -> bool {
        self.set.swap(false, Ordering::SeqCst)
    }

    /// Drops a pending fire without waking anyone.
    pub(crate) fn clear(&self) {
        self.set.store(false, Ordering::SeqCst);
    }

    /// Waits until fired, consuming the fire.
    ///
    /// Relies on `notify_one` storing a permit, so a fire between the flag
    /// check and the wait is not lost. Intended for a single waiter.
    pub(crate) async fn wait(&self) {
        loop {
            if self.take() {
                return;
            }
            self.notify.notified().await;
        }
    }
}

/// Manual-reset level signal backed by a watch channel.
#[derive(Debug)]
pub(crate) struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn set(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(false);
    }

    /// Waits until the gate is cleared. Returns immediately if already clear.
    pub(crate) async fn wait_cleared(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as self, so wait_for cannot fail here.
        let _ = rx.wait_for(|set| !*set).await;
    }
}

/// Sticky cancellation flag for shutting down background tasks.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShutdownToken {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug, Default)]
struct ShutdownInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once the token is cancelled.
    pub(crate) async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking so a concurrent cancel cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::{Gate, ShutdownToken, Trigger};

    #[tokio::test]
    async fn trigger_fire_is_consumed_once() {
        let trigger = Trigger::new();
        trigger.fire();
        assert!(trigger.take());
        assert!(!trigger.take());
    }

    #[tokio::test]
    async fn trigger_fire_before_wait_completes_immediately() {
        let trigger = Trigger::new();
        trigger.fire();
        tokio::time::timeout(Duration::from_secs(1), trigger.wait()).await.unwrap();
    }

    #[tokio::test]
    async fn gate_wait_cleared_observes_clear() {
        let gate = std::sync::Arc::new(Gate::new());
        gate.set();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_cleared().await })
        };
        tokio::task::yield_now().await;
        gate.clear();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_cancel_wakes_waiters() {
        let token = ShutdownToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(token.is_cancelled());
    }
}
