//! Reusable per-view interval timers.
//!
//! Views obtain timers through their [`Invalidater`](super::Invalidater);
//! the renderer pools them in a [`ViewTimerCache`] so a view transition can
//! stop and silence every timer of the outgoing view in one sweep.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

type TickListener = Box<dyn FnMut() + Send>;

/// A restartable interval timer bound to the current view's lifetime.
///
/// Tick listeners are registered once and invoked on every tick until the
/// timer is reset. Listeners must not call back into the timer they are
/// registered on.
pub struct ViewTimer {
    listeners: Mutex<Vec<TickListener>>,
    inner: Mutex<TimerInner>,
}

struct TimerInner {
    interval: Duration,
    enabled: bool,
    task: Option<JoinHandle<()>>,
}

impl ViewTimer {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Mutex::new(Vec::new()),
            inner: Mutex::new(TimerInner {
                interval: Duration::ZERO,
                enabled: false,
                task: None,
            }),
        })
    }

    /// Registers a tick listener. Listeners are cleared when the timer is
    /// reset on a view transition.
    pub fn add_tick_listener(&self, listener: impl FnMut() + Send + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Box::new(listener));
        }
    }

    /// Returns whether the timer is currently scheduled.
    pub fn is_enabled(&self) -> bool {
        self.inner.lock().map(|inner| inner.enabled).unwrap_or(false)
    }

    /// The repeat interval of the last `start` call.
    pub fn interval(&self) -> Duration {
        self.inner.lock().map(|inner| inner.interval).unwrap_or(Duration::ZERO)
    }

    /// Fires once after `delay`, then stops.
    pub fn start_once(self: &Arc<Self>, delay: Duration) {
        self.schedule(delay, None);
    }

    /// Fires after `delay`, then repeatedly at the current interval.
    pub fn start(self: &Arc<Self>, delay: Duration) {
        let interval = self.interval();
        self.schedule(delay, Some(interval));
    }

    /// Fires after `delay`, then repeatedly at `interval`.
    pub fn start_with(self: &Arc<Self>, delay: Duration, interval: Duration) {
        self.schedule(delay, Some(interval));
    }

    /// Stops the timer. Listeners stay registered.
    pub fn stop(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(task) = inner.task.take() {
                task.abort();
            }
            inner.enabled = false;
        }
    }

    /// Stops the timer and clears all listeners.
    pub fn reset(&self) {
        self.stop();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.clear();
        }
    }

    fn schedule(self: &Arc<Self>, delay: Duration, repeat: Option<Duration>) {
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(run_timer(weak, delay, repeat));
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(previous) = inner.task.replace(task) {
                previous.abort();
            }
            if let Some(interval) = repeat {
                inner.interval = interval;
            }
            inner.enabled = true;
        }
    }

    fn fire(&self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            for listener in listeners.iter_mut() {
                listener();
            }
        }
    }

    fn mark_disabled(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.enabled = false;
        }
    }
}

async fn run_timer(timer: Weak<ViewTimer>, delay: Duration, repeat: Option<Duration>) {
    tokio::time::sleep(delay).await;
    loop {
        let Some(timer) = timer.upgrade() else {
            return;
        };
        timer.fire();
        let Some(interval) = repeat else {
            timer.mark_disabled();
            return;
        };
        drop(timer);
        tokio::time::sleep(interval).await;
    }
}

/// Lazily grown pool of [`ViewTimer`]s, reset wholesale on view transitions.
pub(crate) struct ViewTimerCache {
    state: Mutex<CacheState>,
}

struct CacheState {
    timers: Vec<Arc<ViewTimer>>,
    in_use: usize,
}

impl ViewTimerCache {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(CacheState { timers: Vec::new(), in_use: 0 }) }
    }

    /// Hands out the next pooled timer, growing the pool if needed.
    pub(crate) fn get_or_create(&self) -> Arc<ViewTimer> {
        let Ok(mut state) = self.state.lock() else {
            return ViewTimer::new();
        };
        if state.timers.len() <= state.in_use {
            state.timers.push(ViewTimer::new());
        }
        let timer = Arc::clone(&state.timers[state.in_use]);
        state.in_use += 1;
        timer
    }

    /// Stops every timer, clears their listeners and returns them to the pool.
    pub(crate) fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            for timer in &state.timers {
                timer.reset();
            }
            state.in_use = 0;
        }
    }

    /// Stops and drops every pooled timer.
    pub(crate) fn dispose(&self) {
        if let Ok(mut state) = self.state.lock() {
            for timer in &state.timers {
                timer.reset();
            }
            state.in_use = 0;
            state.timers.clear();
        }
    }
}
