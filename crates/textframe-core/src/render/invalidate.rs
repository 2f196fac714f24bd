//! The per-view redraw signal.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::sync::Notify;

use super::timer::{ViewTimer, ViewTimerCache};

/// Outcome of waiting for an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvalidateWait {
    /// The view requested a redraw.
    Invalidated,
    /// The invalidater was deactivated by a view transition.
    Inactive,
}

/// Handle through which the current view requests redraws and timers.
///
/// Exactly one invalidater is live at a time, bound to the current view; a
/// view transition deactivates it and constructs a fresh one. A new
/// invalidater starts invalidated so the view's first frame draws without an
/// explicit request.
pub struct Invalidater {
    invalidated: AtomicBool,
    active: AtomicBool,
    notify: Notify,
    timers: Arc<ViewTimerCache>,
}

impl Invalidater {
    /// A free-standing invalidater with its own timer pool, for tests that
    /// exercise consumers without a renderer.
    #[cfg(test)]
    pub(crate) fn detached() -> Arc<Self> {
        Self::new(Arc::new(ViewTimerCache::new()))
    }

    pub(crate) fn new(timers: Arc<ViewTimerCache>) -> Arc<Self> {
        Arc::new(Self {
            invalidated: AtomicBool::new(true),
            active: AtomicBool::new(true),
            notify: Notify::new(),
            timers,
        })
    }

    /// Requests a redraw of the bound view.
    ///
    /// Returns `false` if this invalidater has been deactivated by a view
    /// transition; the request is then a no-op.
    pub fn invalidate(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.invalidated.store(true, Ordering::SeqCst);
        self.notify.notify_one();
        true
    }

    /// Returns whether this invalidater is still bound to the current view.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Obtains a pooled timer whose lifetime ends with the bound view.
    ///
    /// The returned timer is stopped and its listeners cleared on the next
    /// view transition.
    pub fn create_timer(&self) -> Arc<ViewTimer> {
        self.timers.get_or_create()
    }

    /// Convenience: a timer that invalidates this view on every tick.
    pub fn create_interval(self: &Arc<Self>, delay: Duration, interval: Duration) -> Arc<ViewTimer> {
        let timer = self.create_timer();
        let invalidater = Arc::downgrade(self);
        timer.add_tick_listener(move || {
            if let Some(invalidater) = invalidater.upgrade() {
                invalidater.invalidate();
            }
        });
        timer.start_with(delay, interval);
        timer
    }

    /// Waits until the view requests a redraw or the invalidater is
    /// deactivated, consuming the request.
    pub(crate) async fn wait(&self) -> InvalidateWait {
        loop {
            if !self.is_active() {
                return InvalidateWait::Inactive;
            }
            if self.invalidated.swap(false, Ordering::SeqCst) {
                return InvalidateWait::Invalidated;
            }
            self.notify.notified().await;
        }
    }

    /// Detaches this invalidater from the render loop. Further `invalidate`
    /// calls are no-ops; a pending wait observes `Inactive`.
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }
}
