//! Input-focus contexts and typed input-event dispatch.
//!
//! The [`InputManager`] owns a stack of input contexts: ordered lists of
//! input targets eligible to receive dispatched events. A *temporary*
//! context shadows the stack top until explicitly ended; a *permanent*
//! context is pushed onto the stack and clears any temporary one. Raising an
//! [`InputEvent`] notifies global listeners first, then listeners registered
//! against each target of the active context.
//!
//! The manager performs no cross-call locking: callers (the navigator)
//! are responsible for not interleaving concurrent context pushes.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::broadcast;

/// Capability for input targets that want focus notifications.
pub trait Activatable: Send + Sync {
    /// The target joined the active input context.
    fn on_activated(&self);
    /// The target left the active input context.
    fn on_deactivated(&self);
}

/// A participant in input dispatch.
///
/// Targets are loosely typed: any object can be tracked, but only targets
/// exposing the [`Activatable`] capability receive focus notifications.
pub trait InputTarget: Send + Sync {
    /// The target's activation capability, if it has one.
    fn as_activatable(&self) -> Option<&dyn Activatable> {
        None
    }
}

/// Identity of a target for event registration, derived from its allocation.
///
/// Two clones of the same `Arc` share an identity; distinct allocations do
/// not.
pub fn target_id(target: &Arc<dyn InputTarget>) -> usize {
    Arc::as_ptr(target).cast::<()>() as usize
}

/// Handle for removing a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A typed, reusable dispatch channel.
///
/// Listeners register either globally (notified on every raise) or against a
/// specific target (notified only while that target is in the active input
/// context). Handlers run outside the event's internal locks, so they may
/// register, unregister or raise on the same event; registration changes
/// made during a raise take effect from the next raise.
pub struct InputEvent<T> {
    global: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
    targeted: Mutex<HashMap<usize, Vec<(SubscriptionId, Handler<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Default for InputEvent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InputEvent<T> {
    /// Creates an event with no listeners.
    pub fn new() -> Self {
        Self {
            global: Mutex::new(Vec::new()),
            targeted: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a global listener, notified on every raise.
    pub fn register(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.allocate_id();
        if let Ok(mut global) = self.global.lock() {
            global.push((id, Arc::new(handler)));
        }
        id
    }

    /// Registers a listener for a specific target, notified only while the
    /// target is in the active input context.
    pub fn register_for(
        &self,
        target: &Arc<dyn InputTarget>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_id();
        if let Ok(mut targeted) = self.targeted.lock() {
            targeted.entry(target_id(target)).or_default().push((id, Arc::new(handler)));
        }
        id
    }

    /// Removes a previously registered listener. Unknown ids are ignored.
    pub fn unregister(&self, id: SubscriptionId) {
        if let Ok(mut global) = self.global.lock() {
            global.retain(|(handler_id, _)| *handler_id != id);
        }
        if let Ok(mut targeted) = self.targeted.lock() {
            for handlers in targeted.values_mut() {
                handlers.retain(|(handler_id, _)| *handler_id != id);
            }
            targeted.retain(|_, handlers| !handlers.is_empty());
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn raise_global(&self, args: &T) {
        // Snapshot under the lock, invoke outside it.
        let handlers: Vec<Handler<T>> = self
            .global
            .lock()
            .map(|global| global.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(args);
        }
    }

    fn raise_local(&self, target: usize, args: &T) {
        let handlers: Vec<Handler<T>> = self
            .targeted
            .lock()
            .ok()
            .and_then(|targeted| {
                targeted
                    .get(&target)
                    .map(|handlers| handlers.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            })
            .unwrap_or_default();
        for handler in handlers {
            handler(args);
        }
    }
}

/// Something that reports activity as it happens.
///
/// The [`IdleMonitor`](crate::IdleMonitor) consumes these; the
/// [`InputManager`] is one, and [`ActivityNotifier`] wraps any other source
/// (sensors, background work).
pub trait ActivitySource {
    /// Subscribes to activity notifications.
    fn subscribe_activity(&self) -> broadcast::Receiver<()>;
}

/// A standalone activity source for feeding the idle monitor from places
/// that are not input, such as background jobs keeping the system busy.
#[derive(Debug, Clone)]
pub struct ActivityNotifier {
    tx: broadcast::Sender<()>,
}

impl Default for ActivityNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityNotifier {
    /// Creates a notifier.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(32);
        Self { tx }
    }

    /// Marks one unit of activity.
    pub fn mark_activity(&self) {
        let _ = self.tx.send(());
    }
}

impl ActivitySource for ActivityNotifier {
    fn subscribe_activity(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

struct ContextStack {
    stack: Vec<Vec<Arc<dyn InputTarget>>>,
    temporary: Option<Vec<Arc<dyn InputTarget>>>,
}

impl ContextStack {
    fn active(&self) -> Option<&Vec<Arc<dyn InputTarget>>> {
        self.temporary.as_ref().or_else(|| self.stack.last())
    }

    fn active_mut(&mut self) -> Option<&mut Vec<Arc<dyn InputTarget>>> {
        self.temporary.as_mut().or_else(|| self.stack.last_mut())
    }
}

/// Manages which input targets are notified by raised [`InputEvent`]s.
pub struct InputManager {
    contexts: Mutex<ContextStack>,
    activity: broadcast::Sender<()>,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    /// Creates a manager with an empty context stack.
    pub fn new() -> Self {
        let (activity, _rx) = broadcast::channel(32);
        Self {
            contexts: Mutex::new(ContextStack { stack: Vec::new(), temporary: None }),
            activity,
        }
    }

    /// Starts an input context.
    ///
    /// Deactivates every target of the currently active context, then
    /// activates the new context's targets. A temporary context shadows the
    /// stack top until [`end_context`](Self::end_context); a permanent one
    /// is pushed onto the stack and drops any temporary context.
    pub fn start_context(&self, targets: Vec<Arc<dyn InputTarget>>, temporary: bool) {
        let Ok(mut contexts) = self.contexts.lock() else {
            return;
        };
        if let Some(previous) = contexts.active() {
            deactivate_all(previous);
        }

        tracing::debug!(targets = targets.len(), temporary, "input context started");
        activate_all(&targets);
        if temporary {
            contexts.temporary = Some(targets);
        } else {
            contexts.temporary = None;
            contexts.stack.push(targets);
        }
    }

    /// Adds a target to the active context and activates it.
    ///
    /// No-op when no context is active.
    pub fn add_target(&self, target: Arc<dyn InputTarget>) {
        let Ok(mut contexts) = self.contexts.lock() else {
            return;
        };
        if let Some(active) = contexts.active_mut() {
            if let Some(activatable) = target.as_activatable() {
                activatable.on_activated();
            }
            tracing::debug!("input target added");
            active.push(target);
        }
    }

    /// Removes a target from the active context and deactivates it.
    ///
    /// Identity is by allocation ([`target_id`]); no-op if absent.
    pub fn remove_target(&self, target: &Arc<dyn InputTarget>) {
        let Ok(mut contexts) = self.contexts.lock() else {
            return;
        };
        let id = target_id(target);
        if let Some(active) = contexts.active_mut() {
            let before = active.len();
            active.retain(|candidate| target_id(candidate) != id);
            if active.len() != before {
                if let Some(activatable) = target.as_activatable() {
                    activatable.on_deactivated();
                }
                tracing::debug!("input target removed");
            }
        }
    }

    /// Ends the active context.
    ///
    /// Pops the temporary context if one is active, else the stack top;
    /// deactivates its targets and reactivates the targets of the context
    /// revealed beneath it, if any.
    pub fn end_context(&self) {
        let Ok(mut contexts) = self.contexts.lock() else {
            return;
        };
        let ended = match contexts.temporary.take() {
            Some(temporary) => Some(temporary),
            None => contexts.stack.pop(),
        };
        let Some(ended) = ended else {
            return;
        };

        deactivate_all(&ended);
        tracing::debug!(targets = ended.len(), "input context ended");
        if let Some(revealed) = contexts.stack.last() {
            activate_all(revealed);
        }
    }

    /// The targets of the currently active context, in order.
    pub fn active_targets(&self) -> Vec<Arc<dyn InputTarget>> {
        self.contexts
            .lock()
            .ok()
            .and_then(|contexts| contexts.active().cloned())
            .unwrap_or_default()
    }

    /// Creates a typed dispatch channel.
    pub fn create_event<T>(&self) -> InputEvent<T> {
        InputEvent::new()
    }

    /// Raises an input event.
    ///
    /// Marks activity, then dispatches to global listeners, then to the
    /// listeners of each target in the active context, in context order.
    pub fn raise<T>(&self, event: &InputEvent<T>, args: &T) {
        let _ = self.activity.send(());
        tracing::trace!("raising input event");
        event.raise_global(args);
        for target in self.active_targets() {
            event.raise_local(target_id(&target), args);
        }
    }
}

impl ActivitySource for InputManager {
    fn subscribe_activity(&self) -> broadcast::Receiver<()> {
        self.activity.subscribe()
    }
}

fn activate_all(targets: &[Arc<dyn InputTarget>]) {
    for target in targets {
        if let Some(activatable) = target.as_activatable() {
            activatable.on_activated();
        }
    }
}

fn deactivate_all(targets: &[Arc<dyn InputTarget>]) {
    for target in targets {
        if let Some(activatable) = target.as_activatable() {
            activatable.on_deactivated();
        }
    }
}
