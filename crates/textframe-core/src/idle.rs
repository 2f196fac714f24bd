//! Idle detection over aggregated activity sources.
//!
//! The [`IdleMonitor`] watches two classes of activity with independent
//! timeouts. *Input* activity comes from user-facing sources (typically the
//! [`InputManager`](crate::InputManager)) and drives the input-idle state
//! used for things like dimming a display. *System* activity comes from
//! background work and only postpones the system-idle notification used for
//! power-down decisions.
//!
//! Observers subscribe to a broadcast of [`IdleEvent`]s. Slow observers may
//! lag and miss events; the latest input-idle state is always available via
//! [`IdleMonitor::is_input_idle`].

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::input::ActivitySource;
use crate::signal::ShutdownToken;

/// Notifications emitted by the [`IdleMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Input activity was observed.
    ///
    /// `first` is true only for the synthetic activation emitted when the
    /// monitor starts; later activations mark input-idle to active
    /// transitions.
    Activated {
        /// Whether this is the initial activation on start.
        first: bool,
    },
    /// The input timeout elapsed with no input activity.
    InputIdle,
    /// The system timeout elapsed with no activity of either kind.
    SystemIdle,
}

#[derive(Debug, Clone, Copy)]
enum Activity {
    Input,
    System,
}

/// Watches activity sources and reports idle transitions.
pub struct IdleMonitor {
    input_timeout: Duration,
    system_timeout: Duration,
    input_sources: Mutex<Vec<broadcast::Receiver<()>>>,
    system_sources: Mutex<Vec<broadcast::Receiver<()>>>,
    input_idle: Arc<AtomicBool>,
    events: broadcast::Sender<IdleEvent>,
    shutdown: ShutdownToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl IdleMonitor {
    /// Creates a monitor with the given input and system timeouts.
    ///
    /// Sources are added with [`add_input_source`](Self::add_input_source)
    /// and [`add_system_source`](Self::add_system_source) before
    /// [`start`](Self::start).
    pub fn new(input_timeout: Duration, system_timeout: Duration) -> Self {
        let (events, _rx) = broadcast::channel(32);
        Self {
            input_timeout,
            system_timeout,
            input_sources: Mutex::new(Vec::new()),
            system_sources: Mutex::new(Vec::new()),
            input_idle: Arc::new(AtomicBool::new(false)),
            events,
            shutdown: ShutdownToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Registers a source whose activity counts as input activity.
    pub fn add_input_source(&self, source: &dyn ActivitySource) {
        if let Ok(mut sources) = self.input_sources.lock() {
            sources.push(source.subscribe_activity());
        }
    }

    /// Registers a source whose activity only postpones system idle.
    pub fn add_system_source(&self, source: &dyn ActivitySource) {
        if let Ok(mut sources) = self.system_sources.lock() {
            sources.push(source.subscribe_activity());
        }
    }

    /// Subscribes to idle events.
    pub fn subscribe(&self) -> broadcast::Receiver<IdleEvent> {
        self.events.subscribe()
    }

    /// Whether the monitor currently considers input idle.
    pub fn is_input_idle(&self) -> bool {
        self.input_idle.load(Ordering::SeqCst)
    }

    /// Starts monitoring.
    ///
    /// Emits `Activated { first: true }` immediately and arms both
    /// timeouts. Calling start twice stacks redundant monitor tasks, so
    /// callers start once.
    pub fn start(&self) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::new();
        if let Ok(mut sources) = self.input_sources.lock() {
            for source in sources.drain(..) {
                tasks.push(spawn_forwarder(source, tx.clone(), Activity::Input));
            }
        }
        if let Ok(mut sources) = self.system_sources.lock() {
            for source in sources.drain(..) {
                tasks.push(spawn_forwarder(source, tx.clone(), Activity::System));
            }
        }
        drop(tx);

        let _ = self.events.send(IdleEvent::Activated { first: true });
        tracing::debug!(
            input_timeout_ms = self.input_timeout.as_millis() as u64,
            system_timeout_ms = self.system_timeout.as_millis() as u64,
            "idle monitor started"
        );

        tasks.push(tokio::spawn(monitor_loop(
            rx,
            self.input_timeout,
            self.system_timeout,
            self.input_idle.clone(),
            self.events.clone(),
            self.shutdown.clone(),
        )));

        if let Ok(mut slot) = self.tasks.lock() {
            slot.extend(tasks);
        }
    }

    /// Stops monitoring and aborts the background tasks.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl Drop for IdleMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_forwarder(
    mut source: broadcast::Receiver<()>,
    tx: mpsc::UnboundedSender<Activity>,
    kind: Activity,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match source.recv().await {
                Ok(()) => {
                    if tx.send(kind).is_err() {
                        return;
                    }
                }
                // Missed notifications still count as one burst of activity.
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if tx.send(kind).is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
}

async fn monitor_loop(
    mut activity: mpsc::UnboundedReceiver<Activity>,
    input_timeout: Duration,
    system_timeout: Duration,
    input_idle: Arc<AtomicBool>,
    events: broadcast::Sender<IdleEvent>,
    shutdown: ShutdownToken,
) {
    let mut input_deadline = Some(Instant::now() + input_timeout);
    let mut system_deadline = Some(Instant::now() + system_timeout);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            observed = activity.recv() => {
                let Some(observed) = observed else { return };
                match observed {
                    Activity::Input => {
                        system_deadline = Some(Instant::now() + system_timeout);
                        input_deadline = Some(Instant::now() + input_timeout);
                        if input_idle.swap(false, Ordering::SeqCst) {
                            tracing::debug!("input active again");
                            let _ = events.send(IdleEvent::Activated { first: false });
                        }
                    }
                    Activity::System => {
                        system_deadline = Some(Instant::now() + system_timeout);
                    }
                }
            }
            () = wait_deadline(input_deadline) => {
                input_deadline = None;
                input_idle.store(true, Ordering::SeqCst);
                tracing::debug!("input idle");
                let _ = events.send(IdleEvent::InputIdle);
            }
            () = wait_deadline(system_deadline) => {
                system_deadline = None;
                tracing::debug!("system idle");
                let _ = events.send(IdleEvent::SystemIdle);
            }
        }
    }
}

/// Sleeps until the deadline, or forever when disarmed.
async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::{IdleEvent, IdleMonitor};
    use crate::input::ActivityNotifier;

    const INPUT_TIMEOUT: Duration = Duration::from_millis(100);
    const SYSTEM_TIMEOUT: Duration = Duration::from_millis(300);

    fn monitor() -> (IdleMonitor, ActivityNotifier, ActivityNotifier) {
        let monitor = IdleMonitor::new(INPUT_TIMEOUT, SYSTEM_TIMEOUT);
        let input = ActivityNotifier::new();
        let system = ActivityNotifier::new();
        monitor.add_input_source(&input);
        monitor.add_system_source(&system);
        (monitor, input, system)
    }

    #[tokio::test(start_paused = true)]
    async fn start_emits_initial_activation() {
        let (monitor, _input, _system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });
        assert!(!monitor.is_input_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn input_idle_then_system_idle_without_activity() {
        let (monitor, _input, _system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });

        tokio::time::sleep(INPUT_TIMEOUT + Duration::from_millis(10)).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::InputIdle);
        assert!(monitor.is_input_idle());

        tokio::time::sleep(SYSTEM_TIMEOUT).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::SystemIdle);
    }

    #[tokio::test(start_paused = true)]
    async fn input_activity_postpones_both_timeouts() {
        let (monitor, input, _system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });

        // Keep poking just inside the input timeout past the point where
        // system idle would otherwise have fired.
        for _ in 0..5 {
            tokio::time::sleep(INPUT_TIMEOUT - Duration::from_millis(10)).await;
            input.mark_activity();
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert!(!monitor.is_input_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_fires_only_after_input_idle() {
        let (monitor, input, _system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });

        // Activity while already active stays silent.
        input.mark_activity();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

        tokio::time::sleep(INPUT_TIMEOUT + Duration::from_millis(10)).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::InputIdle);

        input.mark_activity();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: false });
        assert!(!monitor.is_input_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn system_activity_defers_system_idle_only() {
        let (monitor, _input, system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });

        tokio::time::sleep(INPUT_TIMEOUT + Duration::from_millis(10)).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::InputIdle);

        // System activity does not wake input, but keeps system idle away.
        // Stay inside the original system deadline (started at monitor start).
        tokio::time::sleep(Duration::from_millis(150)).await;
        system.mark_activity();
        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert!(monitor.is_input_idle());

        tokio::time::sleep(SYSTEM_TIMEOUT).await;
        assert_eq!(events.recv().await.unwrap(), IdleEvent::SystemIdle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_event_delivery() {
        let (monitor, input, _system) = monitor();
        let mut events = monitor.subscribe();
        monitor.start();
        assert_eq!(events.recv().await.unwrap(), IdleEvent::Activated { first: true });

        monitor.shutdown();
        tokio::time::sleep(INPUT_TIMEOUT + Duration::from_millis(10)).await;
        input.mark_activity();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }
}
