//! The current-view slot, the transition protocol and the render loop.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use super::context::RenderingContext;
use super::invalidate::{InvalidateWait, Invalidater};
use super::pacing::IntervalSynchronizer;
use super::timer::ViewTimerCache;
use crate::device::{CharacterContext, DeviceError, TextDisplayDevice};
use crate::signal::{Gate, ShutdownToken, Trigger};
use crate::view::{EmptyTextView, FaultTextView, TextView, ViewError};

/// Callback invoked with the outgoing view while a transition holds the
/// slot lock, between disposing the old invalidater and installing the new
/// view. The navigator uses it to update its bookkeeping atomically with the
/// swap.
pub type TransitionHook<'a> = Box<dyn FnOnce(Arc<dyn TextView>) + Send + 'a>;

/// Errors from [`TextViewRenderer::try_set_view`].
#[derive(Debug, Error)]
pub enum SetViewError {
    /// The requested view is already current; no close/show hooks ran.
    #[error("the view is already current")]
    AlreadySet,

    /// The outgoing view's closing hook failed. The old view remains current.
    #[error("the outgoing view failed to close: {0}")]
    Closing(ViewError),

    /// The incoming view's showing hook failed. The new view is installed.
    #[error("the incoming view failed to show: {0}")]
    Showing(ViewError),
}

/// The failure carried by a render fault.
#[derive(Debug, Error)]
pub enum RenderFaultError {
    /// The view's draw call failed.
    #[error("view draw failed: {0}")]
    Draw(ViewError),

    /// Flushing a buffered instruction to the device failed.
    #[error("instruction flush failed: {0}")]
    Flush(#[from] DeviceError),
}

/// A failure raised from the render loop's draw or flush step, with the
/// offending view attached.
pub struct RenderFault {
    /// The view whose pass failed.
    pub view: Arc<dyn TextView>,
    /// What went wrong.
    pub error: RenderFaultError,
}

impl fmt::Debug for RenderFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderFault").field("error", &self.error).finish_non_exhaustive()
    }
}

/// What the render loop does after a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultAction {
    /// Stop rendering; the current view is replaced by a [`FaultTextView`].
    #[default]
    Halt,
    /// Skip the failed pass and keep rendering.
    Continue,
}

type FaultHandler = Box<dyn Fn(&RenderFault) -> FaultAction + Send + Sync>;

struct ViewSlot {
    current: Arc<dyn TextView>,
    invalidater: Arc<Invalidater>,
}

struct RendererShared {
    slot: tokio::sync::Mutex<ViewSlot>,
    snapshot: RwLock<Arc<dyn TextView>>,
    abort: Trigger,
    rendering: Gate,
    shutdown: ShutdownToken,
    device: Arc<dyn TextDisplayDevice>,
    timers: Arc<ViewTimerCache>,
    refresh_interval: Duration,
    character_context: Mutex<Option<Arc<dyn CharacterContext>>>,
    fault_handler: Mutex<Option<FaultHandler>>,
}

/// Renders text views onto a display device at a paced refresh rate.
///
/// Owns the single current view and a background render loop. View
/// transitions go through [`try_set_view`](Self::try_set_view), which
/// serializes against the loop: the loop never draws an outgoing view after
/// its closing hook has begun.
pub struct TextViewRenderer {
    shared: Arc<RendererShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TextViewRenderer {
    /// Creates a renderer for the given device.
    ///
    /// `refresh_interval` paces successive render passes; zero disables
    /// pacing. The current view starts as the empty sentinel.
    pub fn new(device: Arc<dyn TextDisplayDevice>, refresh_interval: Duration) -> Self {
        let timers = Arc::new(ViewTimerCache::new());
        let sentinel: Arc<dyn TextView> = Arc::new(EmptyTextView);
        Self {
            shared: Arc::new(RendererShared {
                slot: tokio::sync::Mutex::new(ViewSlot {
                    current: Arc::clone(&sentinel),
                    invalidater: Invalidater::new(Arc::clone(&timers)),
                }),
                snapshot: RwLock::new(sentinel),
                abort: Trigger::new(),
                rendering: Gate::new(),
                shutdown: ShutdownToken::new(),
                device,
                timers,
                refresh_interval,
                character_context: Mutex::new(None),
                fault_handler: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Installs the render-fault handler.
    ///
    /// The handler observes every fault and decides whether the loop halts
    /// (the default when no handler is installed) or skips the failed pass.
    pub fn set_fault_handler(
        &self,
        handler: impl Fn(&RenderFault) -> FaultAction + Send + Sync + 'static,
    ) {
        if let Ok(mut slot) = self.shared.fault_handler.lock() {
            *slot = Some(Box::new(handler));
        }
    }

    /// Starts the background render loop. Idempotent: a second call while
    /// the loop is running is a no-op.
    ///
    /// Clears the display, primes the custom-glyph capability and launches
    /// the loop. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), DeviceError> {
        let Ok(mut task) = self.task.lock() else {
            return Ok(());
        };
        if task.as_ref().is_some_and(|running| !running.is_finished()) {
            return Ok(());
        }

        let mut context = RenderingContext::new(Arc::clone(&self.shared.device));
        context.clear();
        for instruction in context.instructions() {
            instruction.apply(&*self.shared.device)?;
        }
        context.reset();

        if let Ok(mut character_context) = self.shared.character_context.lock() {
            *character_context = self.shared.device.try_character_context();
        }

        self.shared.abort.clear();
        *task = Some(tokio::spawn(render_loop(Arc::clone(&self.shared), context)));
        tracing::debug!("renderer started");
        Ok(())
    }

    /// A snapshot of the current view.
    pub fn current_view(&self) -> Arc<dyn TextView> {
        self.shared
            .snapshot
            .read()
            .map(|snapshot| Arc::clone(&snapshot))
            .unwrap_or_else(|_| Arc::new(EmptyTextView))
    }

    /// Replaces the current view.
    ///
    /// Under the exclusive transition lock: aborts the in-flight render
    /// pass, waits for the loop to acknowledge it has stopped, awaits the
    /// outgoing view's closing hook, resets the timer pool, disposes the old
    /// invalidater, runs `on_transitioning` with the old view, installs
    /// `new_view`, constructs a fresh invalidater and awaits the incoming
    /// view's showing hook.
    ///
    /// Returns the previous view on success, [`SetViewError::AlreadySet`]
    /// without side effects if `new_view` is already current.
    pub async fn try_set_view(
        &self,
        new_view: Arc<dyn TextView>,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<Arc<dyn TextView>, SetViewError> {
        tracing::trace!("waiting for access to change view");
        let mut slot = self.shared.slot.lock().await;
        if Arc::ptr_eq(&slot.current, &new_view) {
            tracing::debug!("view already set");
            return Err(SetViewError::AlreadySet);
        }

        let old_view = Arc::clone(&slot.current);
        self.shared.abort.fire();
        tracing::trace!("waiting for rendering to stop");
        self.shared.rendering.wait_cleared().await;

        if let Err(error) = old_view.on_closing().await {
            drop(slot);
            // Wake the parked loop so the still-current view keeps rendering.
            self.shared.abort.fire();
            return Err(SetViewError::Closing(error));
        }

        self.shared.timers.reset();
        slot.invalidater.deactivate();
        if let Some(hook) = on_transitioning {
            hook(Arc::clone(&old_view));
        }

        slot.current = Arc::clone(&new_view);
        let invalidater = Invalidater::new(Arc::clone(&self.shared.timers));
        slot.invalidater = Arc::clone(&invalidater);
        if let Ok(mut snapshot) = self.shared.snapshot.write() {
            *snapshot = Arc::clone(&new_view);
        }

        let character_context =
            self.shared.character_context.lock().ok().and_then(|slot| slot.clone());
        let shown = new_view.on_showing(invalidater, character_context).await;
        drop(slot);
        // Wake the parked loop to pick up the new view.
        self.shared.abort.fire();

        match shown {
            Ok(()) => {
                tracing::debug!("view changed");
                Ok(old_view)
            }
            Err(error) => Err(SetViewError::Showing(error)),
        }
    }

    /// Stops the render loop, disposes all timers and resets the current
    /// view to the empty sentinel. Unconditional: runs to completion even if
    /// a prior operation left the renderer faulted.
    pub async fn shutdown(&self) {
        tracing::debug!("renderer stopping");
        self.shared.shutdown.cancel();
        self.shared.abort.fire();

        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            let _ = task.await;
        }

        let mut slot = self.shared.slot.lock().await;
        slot.invalidater.deactivate();
        let sentinel: Arc<dyn TextView> = Arc::new(EmptyTextView);
        slot.current = Arc::clone(&sentinel);
        if let Ok(mut snapshot) = self.shared.snapshot.write() {
            *snapshot = sentinel;
        }
        drop(slot);

        self.shared.timers.dispose();
        tracing::debug!("renderer stopped");
    }
}

impl Drop for TextViewRenderer {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
        if let Ok(mut task) = self.task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        self.shared.timers.dispose();
    }
}

impl fmt::Debug for TextViewRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextViewRenderer")
            .field("refresh_interval", &self.shared.refresh_interval)
            .finish_non_exhaustive()
    }
}

enum PassExit {
    /// Run another pass.
    Continue,
    /// An unhandled fault stopped rendering for good.
    Halt,
}

enum FlushResult {
    Completed,
    Aborted,
}

async fn render_loop(shared: Arc<RendererShared>, mut context: RenderingContext) {
    let mut synchronizer = IntervalSynchronizer::new(shared.refresh_interval);
    tracing::debug!("render loop running");
    while !shared.shutdown.is_cancelled() {
        match render_pass(&shared, &mut context, &mut synchronizer).await {
            PassExit::Continue => {}
            PassExit::Halt => break,
        }
    }
    shared.rendering.clear();
    tracing::debug!("render loop exited");
}

async fn render_pass(
    shared: &Arc<RendererShared>,
    context: &mut RenderingContext,
    synchronizer: &mut IntervalSynchronizer,
) -> PassExit {
    shared.rendering.set();

    // Non-blocking read: a held lock means a transition is in progress and
    // this pass has no view to draw.
    let acquired = shared
        .slot
        .try_lock()
        .map(|slot| (Arc::clone(&slot.current), Arc::clone(&slot.invalidater)))
        .ok();

    let Some((view, invalidater)) = acquired else {
        // Parked: the gate must drop before the wait, since the transition
        // holding the slot lock blocks on it. The abort trigger doubles as
        // the wake-up once the transition completes.
        shared.rendering.clear();
        tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => {}
            () = shared.abort.wait() => {}
        }
        return PassExit::Continue;
    };

    tracing::trace!("view acquired for rendering");
    let exit = loop {
        let wait = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break PassExit::Continue,
            () = shared.abort.wait() => {
                tracing::trace!("rendering aborted");
                break PassExit::Continue;
            }
            wait = invalidater.wait() => wait,
        };
        if wait == InvalidateWait::Inactive {
            tracing::trace!("invalidater no longer active");
            break PassExit::Continue;
        }

        if synchronizer.synchronize(&shared.abort, &shared.shutdown).await.is_interrupted() {
            tracing::trace!("rendering aborted during pacing");
            break PassExit::Continue;
        }

        match draw_and_flush(shared, &view, context) {
            Ok(FlushResult::Completed) => {
                context.reset();
            }
            Ok(FlushResult::Aborted) => {
                tracing::trace!("rendering aborted mid-flush");
                context.reset();
                break PassExit::Continue;
            }
            Err(error) => {
                context.reset();
                let fault = RenderFault { view: Arc::clone(&view), error };
                tracing::error!(error = %fault.error, "render fault");
                let action = shared
                    .fault_handler
                    .lock()
                    .ok()
                    .and_then(|handler| handler.as_ref().map(|handler| handler(&fault)))
                    .unwrap_or_default();
                match action {
                    FaultAction::Continue => {}
                    FaultAction::Halt => {
                        install_fault_sentinel(shared, &fault);
                        break PassExit::Halt;
                    }
                }
            }
        }
    };

    shared.rendering.clear();
    exit
}

fn draw_and_flush(
    shared: &RendererShared,
    view: &Arc<dyn TextView>,
    context: &mut RenderingContext,
) -> Result<FlushResult, RenderFaultError> {
    view.draw(context).map_err(RenderFaultError::Draw)?;
    for instruction in context.instructions() {
        // Mid-flush abort: a transition may interrupt between instructions,
        // accepting a partial frame on the device.
        if shared.abort.take() {
            return Ok(FlushResult::Aborted);
        }
        instruction.apply(&**context.device())?;
    }
    Ok(FlushResult::Completed)
}

fn install_fault_sentinel(shared: &RendererShared, fault: &RenderFault) {
    // If a transition holds the lock it is already replacing the view; the
    // sentinel is only installed when the slot is free.
    let Ok(mut slot) = shared.slot.try_lock() else {
        return;
    };
    slot.invalidater.deactivate();
    shared.timers.reset();
    let sentinel: Arc<dyn TextView> = Arc::new(FaultTextView::new(fault.error.to_string()));
    slot.current = Arc::clone(&sentinel);
    slot.invalidater = Invalidater::new(Arc::clone(&shared.timers));
    if let Ok(mut snapshot) = shared.snapshot.write() {
        *snapshot = sentinel;
    }
    tracing::warn!("render loop halted; fault sentinel installed");
}
