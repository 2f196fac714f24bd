//! Navigator tests: history stack, show overrides and modal input contexts.
//!
//! The renderer's transition protocol works without the background loop
//! running, so these tests skip `start` and stay fully deterministic.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use textframe_harness::{EventLog, ProbeTarget, ProbeView};

use textframe_core::{
    InputManager, InputTarget, NavigationError, Size, TextView, TextViewNavigator, TextViewRenderer,
};

fn navigator() -> (Arc<TextViewNavigator>, Arc<InputManager>) {
    let device = textframe_harness::RecordingDisplayDevice::new(Size::new(20, 4));
    let renderer = Arc::new(TextViewRenderer::new(device, Duration::ZERO));
    let input = Arc::new(InputManager::new());
    (Arc::new(TextViewNavigator::new(renderer, input.clone())), input)
}

fn view(label: &str) -> Arc<ProbeView> {
    ProbeView::new(label, label, EventLog::new())
}

fn as_view(probe: &Arc<ProbeView>) -> Arc<dyn TextView> {
    probe.clone()
}

fn as_target(probe: &Arc<ProbeTarget>) -> Arc<dyn InputTarget> {
    probe.clone()
}

#[tokio::test]
async fn navigate_to_pushes_history_and_back_pops_it() {
    let (navigator, _input) = navigator();
    let first = view("a");
    let second = view("b");

    assert!(navigator.navigate_to(as_view(&first), None).await.unwrap());
    assert!(navigator.navigate_to(as_view(&second), None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&second)));

    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&first)));
    assert_eq!(first.shown(), 2);

    // One more back reaches the root sentinel, then the history is spent.
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn navigating_to_the_current_view_is_a_no_op() {
    let (navigator, _input) = navigator();
    let first = view("a");
    assert!(navigator.navigate_to(as_view(&first), None).await.unwrap());
    assert!(!navigator.navigate_to(as_view(&first), None).await.unwrap());
    assert_eq!(first.shown(), 1);
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn show_is_not_recorded_in_history() {
    let (navigator, _input) = navigator();
    let pushed = view("a");
    let overlay = view("b");

    navigator.navigate_to(as_view(&pushed), None).await.unwrap();
    assert!(navigator.show(as_view(&overlay), None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&overlay)));

    // Back leaves the overlay and lands on the pushed view, not beneath it.
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&pushed)));
    assert_eq!(overlay.closed(), 1);

    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn a_second_show_replaces_the_first_override() {
    let (navigator, _input) = navigator();
    let first = view("a");
    let second = view("b");

    navigator.show(as_view(&first), None).await.unwrap();
    navigator.show(as_view(&second), None).await.unwrap();
    assert_eq!(first.closed(), 1);

    // Back returns to the stack root, skipping the replaced override.
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!Arc::ptr_eq(&navigator.current_view(), &as_view(&first)));
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn back_consumes_duplicate_history_entries() {
    let (navigator, _input) = navigator();
    let repeat = view("a");
    let overlay = view("b");

    // The same view ends up in two adjacent history entries.
    navigator.navigate_to(as_view(&repeat), None).await.unwrap();
    navigator.show(as_view(&overlay), None).await.unwrap();
    navigator.navigate_to(as_view(&repeat), None).await.unwrap();

    // The first back pops the duplicate even though the revealed view is
    // already on screen; the second transitions down to the root.
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&repeat)));
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!Arc::ptr_eq(&navigator.current_view(), &as_view(&repeat)));
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn transition_callback_observes_the_outgoing_view() {
    let (navigator, _input) = navigator();
    let first = view("a");
    let second = view("b");
    navigator.navigate_to(as_view(&first), None).await.unwrap();

    let observed: Mutex<Option<Arc<dyn TextView>>> = Mutex::new(None);
    navigator
        .navigate_to(
            as_view(&second),
            Some(Box::new(|old| {
                *observed.lock().unwrap() = Some(old);
            })),
        )
        .await
        .unwrap();

    let observed = observed.into_inner().unwrap().unwrap();
    assert!(Arc::ptr_eq(&observed, &as_view(&first)));
}

#[tokio::test]
async fn back_runs_the_transition_callback() {
    let (navigator, _input) = navigator();
    let first = view("a");
    let second = view("b");
    navigator.navigate_to(as_view(&first), None).await.unwrap();
    navigator.navigate_to(as_view(&second), None).await.unwrap();

    let observed: Mutex<Option<Arc<dyn TextView>>> = Mutex::new(None);
    navigator
        .navigate_back(Some(Box::new(|old| {
            *observed.lock().unwrap() = Some(old);
        })))
        .await
        .unwrap();

    let observed = observed.into_inner().unwrap().unwrap();
    assert!(Arc::ptr_eq(&observed, &as_view(&second)));
}

#[tokio::test]
async fn modal_navigation_requires_input_targets() {
    let (navigator, input) = navigator();
    let plain = view("a");

    let result = navigator.navigate_to_modal(as_view(&plain), None, Vec::new()).await;
    assert!(matches!(result, Err(NavigationError::NoInputTargets)));

    // Nothing changed: no view installed, no context started, no history.
    assert!(!Arc::ptr_eq(&navigator.current_view(), &as_view(&plain)));
    assert_eq!(plain.shown(), 0);
    assert!(input.active_targets().is_empty());
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn extra_targets_do_not_satisfy_modal_validation() {
    let (navigator, input) = navigator();
    let plain = view("a");
    let extra = ProbeTarget::new();

    // The view's own target set is what counts, not what the caller adds.
    let result =
        navigator.navigate_to_modal(as_view(&plain), None, vec![as_target(&extra)]).await;
    assert!(matches!(result, Err(NavigationError::NoInputTargets)));
    assert_eq!(plain.shown(), 0);
    assert!(!extra.is_active());
    assert!(input.active_targets().is_empty());
    assert!(!navigator.navigate_back(None).await.unwrap());
}

#[tokio::test]
async fn modal_navigation_activates_targets_until_back() {
    let (navigator, input) = navigator();
    let target = ProbeTarget::new();
    let modal = view("a");
    modal.add_target(as_target(&target));

    assert!(navigator.navigate_to_modal(as_view(&modal), None, Vec::new()).await.unwrap());
    assert!(target.is_active());
    assert_eq!(input.active_targets().len(), 1);

    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(!target.is_active());
    assert!(input.active_targets().is_empty());
}

#[tokio::test]
async fn extra_targets_join_the_modal_context() {
    let (navigator, input) = navigator();
    let own = ProbeTarget::new();
    let extra = ProbeTarget::new();
    let modal = view("a");
    modal.add_target(as_target(&own));

    navigator.navigate_to_modal(as_view(&modal), None, vec![as_target(&extra)]).await.unwrap();
    assert!(own.is_active());
    assert!(extra.is_active());
    assert_eq!(input.active_targets().len(), 2);
}

#[tokio::test]
async fn show_modal_accepts_a_view_without_targets() {
    let (navigator, input) = navigator();
    let base_target = ProbeTarget::new();
    let base = view("a");
    base.add_target(as_target(&base_target));
    let overlay = view("b");

    navigator.navigate_to_modal(as_view(&base), None, Vec::new()).await.unwrap();

    // The overlay's empty temporary context shadows the base context.
    assert!(navigator.show_modal(as_view(&overlay), None, Vec::new()).await.unwrap());
    assert!(!base_target.is_active());
    assert!(input.active_targets().is_empty());

    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(base_target.is_active());
}

#[tokio::test]
async fn show_modal_shadows_the_permanent_context() {
    let (navigator, input) = navigator();
    let base_target = ProbeTarget::new();
    let base = view("a");
    base.add_target(as_target(&base_target));
    let overlay_target = ProbeTarget::new();
    let overlay = view("b");
    overlay.add_target(as_target(&overlay_target));

    navigator.navigate_to_modal(as_view(&base), None, Vec::new()).await.unwrap();
    navigator.show_modal(as_view(&overlay), None, Vec::new()).await.unwrap();
    assert!(!base_target.is_active());
    assert!(overlay_target.is_active());

    // Leaving the overlay restores the base view and its input context.
    assert!(navigator.navigate_back(None).await.unwrap());
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&base)));
    assert!(base_target.is_active());
    assert!(!overlay_target.is_active());
    assert_eq!(input.active_targets().len(), 1);
}

#[tokio::test]
async fn failed_close_aborts_back_without_popping() {
    let (navigator, _input) = navigator();
    let first = view("a");
    let second = view("b");
    navigator.navigate_to(as_view(&first), None).await.unwrap();
    navigator.navigate_to(as_view(&second), None).await.unwrap();

    second.fail_closing();
    let result = navigator.navigate_back(None).await;
    assert!(matches!(result, Err(NavigationError::Transition(_))));
    assert!(Arc::ptr_eq(&navigator.current_view(), &as_view(&second)));

    // The stack was not popped: the entry stays reachable once the close
    // succeeds again.
    assert_eq!(first.shown(), 1);
}
