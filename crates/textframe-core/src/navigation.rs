//! Stack-based navigation between text views.
//!
//! The [`TextViewNavigator`] sits on top of the
//! [`TextViewRenderer`](crate::TextViewRenderer) and the
//! [`InputManager`](crate::InputManager). It keeps a history stack of views
//! plus an optional *show override*: a view displayed in place of the stack
//! top without becoming part of the history. Modal operations additionally
//! manage an input context for the shown view's targets.
//!
//! Navigator bookkeeping is mutated inside the renderer's transition hook,
//! so the stack changes exactly when the view swap is committed. Every
//! operation accepts an optional [`TransitionHook`] of its own, invoked
//! right after the bookkeeping while the transition still holds the slot
//! lock.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::input::{InputManager, InputTarget};
use crate::render::{SetViewError, TextViewRenderer, TransitionHook};
use crate::view::TextView;

/// Errors from navigation operations.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Modal history navigation was requested for a view that declares no
    /// input targets of its own.
    #[error("modal view provides no input targets")]
    NoInputTargets,

    /// The underlying view transition failed.
    #[error("view transition failed: {0}")]
    Transition(#[from] SetViewError),
}

#[derive(Clone)]
struct NavigationEntry {
    view: Arc<dyn TextView>,
    is_modal: bool,
}

struct NavState {
    stack: Vec<NavigationEntry>,
    show_override: Option<NavigationEntry>,
}

/// Navigates between text views with history and modal input contexts.
pub struct TextViewNavigator {
    renderer: Arc<TextViewRenderer>,
    input: Arc<InputManager>,
    // Serializes whole navigation operations; per-call state mutation still
    // happens inside the transition hook under the renderer's slot lock.
    operation: tokio::sync::Mutex<()>,
    state: Mutex<NavState>,
}

impl TextViewNavigator {
    /// Creates a navigator over a renderer and input manager.
    ///
    /// The renderer's current view (normally the empty sentinel) seeds the
    /// bottom of the history stack and can never be popped.
    pub fn new(renderer: Arc<TextViewRenderer>, input: Arc<InputManager>) -> Self {
        let root = NavigationEntry { view: renderer.current_view(), is_modal: false };
        Self {
            renderer,
            input,
            operation: tokio::sync::Mutex::new(()),
            state: Mutex::new(NavState { stack: vec![root], show_override: None }),
        }
    }

    /// The view currently installed in the renderer.
    pub fn current_view(&self) -> Arc<dyn TextView> {
        self.renderer.current_view()
    }

    /// Shows a view without recording it in the history.
    ///
    /// The view replaces any previous override; [`navigate_back`]
    /// (Self::navigate_back) returns to the stack top. Returns `Ok(false)`
    /// when the view is already current.
    pub async fn show(
        &self,
        view: Arc<dyn TextView>,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<bool, NavigationError> {
        let _operation = self.operation.lock().await;
        self.transition_override(view, false, Vec::new(), on_transitioning).await
    }

    /// Shows a view modally without recording it in the history.
    ///
    /// The view's input targets plus `extra_targets` form a temporary input
    /// context, activated once the swap commits. The combined target list
    /// may be empty; the temporary context then shadows the previous one
    /// with nothing focused.
    pub async fn show_modal(
        &self,
        view: Arc<dyn TextView>,
        on_transitioning: Option<TransitionHook<'_>>,
        extra_targets: Vec<Arc<dyn InputTarget>>,
    ) -> Result<bool, NavigationError> {
        let _operation = self.operation.lock().await;
        let mut targets = view.input_targets().unwrap_or_default();
        targets.extend(extra_targets);
        self.transition_override(view, true, targets, on_transitioning).await
    }

    /// Navigates to a view, pushing it onto the history stack.
    ///
    /// Clears any show override. Returns `Ok(false)` when the view is
    /// already current.
    pub async fn navigate_to(
        &self,
        view: Arc<dyn TextView>,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<bool, NavigationError> {
        let _operation = self.operation.lock().await;
        self.transition_push(view, false, Vec::new(), on_transitioning).await
    }

    /// Navigates to a view modally, pushing it onto the history stack.
    ///
    /// Starts a permanent input context from the view's input targets plus
    /// `extra_targets`; the context ends when the view is navigated back
    /// from. Fails with [`NavigationError::NoInputTargets`], before any
    /// transition, when the view itself declares no targets. Extra targets
    /// never satisfy that requirement on their own.
    pub async fn navigate_to_modal(
        &self,
        view: Arc<dyn TextView>,
        on_transitioning: Option<TransitionHook<'_>>,
        extra_targets: Vec<Arc<dyn InputTarget>>,
    ) -> Result<bool, NavigationError> {
        let _operation = self.operation.lock().await;
        let targets = modal_targets(&view, extra_targets)?;
        self.transition_push(view, true, targets, on_transitioning).await
    }

    /// Navigates back.
    ///
    /// Leaves an active show override for the stack top, or pops the stack
    /// top to reveal the view beneath it. Ends the associated input context
    /// when the left view was modal. A back target that is already current
    /// still consumes the override or stack entry and counts as going back.
    /// Returns `Ok(false)` when there is nowhere to go back to.
    ///
    /// `on_transitioning` runs only when a view swap is committed.
    pub async fn navigate_back(
        &self,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<bool, NavigationError> {
        let _operation = self.operation.lock().await;

        enum Back {
            Override { target: Arc<dyn TextView>, was_modal: bool },
            Pop { target: Arc<dyn TextView>, was_modal: bool },
            Exhausted,
        }

        let plan = {
            let Ok(state) = self.state.lock() else {
                return Ok(false);
            };
            match (&state.show_override, state.stack.as_slice()) {
                (Some(entry), [.., top]) => Back::Override {
                    target: Arc::clone(&top.view),
                    was_modal: entry.is_modal,
                },
                (None, [.., beneath, top]) => Back::Pop {
                    target: Arc::clone(&beneath.view),
                    was_modal: top.is_modal,
                },
                _ => Back::Exhausted,
            }
        };

        let (target, was_modal, pop) = match plan {
            Back::Override { target, was_modal } => (target, was_modal, false),
            Back::Pop { target, was_modal } => (target, was_modal, true),
            Back::Exhausted => return Ok(false),
        };

        let hook: TransitionHook<'_> = Box::new(move |old| {
            if let Ok(mut state) = self.state.lock() {
                state.show_override = None;
                if pop {
                    state.stack.pop();
                }
            }
            if let Some(callback) = on_transitioning {
                callback(old);
            }
        });

        match self.renderer.try_set_view(target, Some(hook)).await {
            Ok(_old) => {
                if was_modal {
                    self.input.end_context();
                }
                tracing::debug!(popped = pop, "navigated back");
                Ok(true)
            }
            // The revealed view is already on screen, which happens when the
            // history holds the same view twice in a row. The entry is spent
            // all the same, otherwise back would never make progress past it.
            Err(SetViewError::AlreadySet) => {
                if let Ok(mut state) = self.state.lock() {
                    state.show_override = None;
                    if pop {
                        state.stack.pop();
                    }
                }
                if was_modal {
                    self.input.end_context();
                }
                tracing::debug!(popped = pop, "navigated back without a view change");
                Ok(true)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn transition_override(
        &self,
        view: Arc<dyn TextView>,
        is_modal: bool,
        targets: Vec<Arc<dyn InputTarget>>,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<bool, NavigationError> {
        let entry = NavigationEntry { view: Arc::clone(&view), is_modal };
        let hook: TransitionHook<'_> = Box::new(move |old| {
            if let Ok(mut state) = self.state.lock() {
                state.show_override = Some(entry);
            }
            if let Some(callback) = on_transitioning {
                callback(old);
            }
        });

        match self.renderer.try_set_view(view, Some(hook)).await {
            Ok(_old) => {
                if is_modal {
                    self.input.start_context(targets, true);
                }
                tracing::debug!(modal = is_modal, "showing view");
                Ok(true)
            }
            Err(SetViewError::AlreadySet) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    async fn transition_push(
        &self,
        view: Arc<dyn TextView>,
        is_modal: bool,
        targets: Vec<Arc<dyn InputTarget>>,
        on_transitioning: Option<TransitionHook<'_>>,
    ) -> Result<bool, NavigationError> {
        let entry = NavigationEntry { view: Arc::clone(&view), is_modal };
        let hook: TransitionHook<'_> = Box::new(move |old| {
            if let Ok(mut state) = self.state.lock() {
                state.show_override = None;
                state.stack.push(entry);
            }
            if let Some(callback) = on_transitioning {
                callback(old);
            }
        });

        match self.renderer.try_set_view(view, Some(hook)).await {
            Ok(_old) => {
                if is_modal {
                    self.input.start_context(targets, false);
                }
                tracing::debug!(modal = is_modal, "navigated to view");
                Ok(true)
            }
            Err(SetViewError::AlreadySet) => Ok(false),
            Err(error) => Err(error.into()),
        }
    }
}

fn modal_targets(
    view: &Arc<dyn TextView>,
    extra_targets: Vec<Arc<dyn InputTarget>>,
) -> Result<Vec<Arc<dyn InputTarget>>, NavigationError> {
    let mut targets = view.input_targets().unwrap_or_default();
    if targets.is_empty() {
        return Err(NavigationError::NoInputTargets);
    }
    targets.extend(extra_targets);
    Ok(targets)
}
