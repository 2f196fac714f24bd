//! End-to-end tests for the renderer: transition protocol, invalidation,
//! pacing interruption and fault handling, all against the recording device.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use textframe_harness::{EventLog, ProbeView, RecordedOp, RecordingDisplayDevice};

use textframe_core::{FaultAction, SetViewError, Size, TextView, TextViewRenderer};

const SIZE: Size = Size::new(20, 4);

fn renderer(interval: Duration) -> (Arc<TextViewRenderer>, Arc<RecordingDisplayDevice>) {
    let device = RecordingDisplayDevice::new(SIZE);
    let renderer = Arc::new(TextViewRenderer::new(device.clone(), interval));
    (renderer, device)
}

fn as_view(probe: &Arc<ProbeView>) -> Arc<dyn TextView> {
    probe.clone()
}

/// Lets the paused clock hand control to the render loop.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test(start_paused = true)]
async fn start_clears_the_display() {
    let (renderer, device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    assert_eq!(device.ops().first(), Some(&RecordedOp::Clear));
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn first_pass_draws_the_installed_view() {
    let (renderer, device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let log = EventLog::new();
    let view = ProbeView::new("a", "hello", log);

    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;

    assert_eq!(view.shown(), 1);
    assert_eq!(view.draws(), 1);
    assert!(device.ops().contains(&RecordedOp::Write("hello".into())));
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn redraw_requires_invalidation() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;
    assert_eq!(view.draws(), 1);

    settle().await;
    assert_eq!(view.draws(), 1);

    assert!(view.invalidater().unwrap().invalidate());
    settle().await;
    assert_eq!(view.draws(), 2);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn setting_the_current_view_again_is_rejected() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    renderer.try_set_view(as_view(&view), None).await.unwrap();

    let result = renderer.try_set_view(as_view(&view), None).await;
    assert!(matches!(result, Err(SetViewError::AlreadySet)));
    assert_eq!(view.shown(), 1);
    assert_eq!(view.closed(), 0);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transition_closes_the_old_view_before_showing_the_new() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let log = EventLog::new();
    let first = ProbeView::new("a", "first", log.clone());
    let second = ProbeView::new("b", "second", log.clone());

    renderer.try_set_view(as_view(&first), None).await.unwrap();
    settle().await;
    renderer.try_set_view(as_view(&second), None).await.unwrap();
    settle().await;

    let closing = log.position("a:closing").unwrap();
    let showing = log.position("b:showing").unwrap();
    assert!(closing < showing, "closing must precede showing: {:?}", log.entries());

    // The old view never draws again once its closing hook has run.
    let stale_draw =
        log.entries().iter().enumerate().filter(|(_, e)| *e == "a:draw").map(|(i, _)| i).max();
    assert!(stale_draw.unwrap() < closing);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transition_hook_observes_the_outgoing_view() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let first = ProbeView::new("a", "first", EventLog::new());
    let second = ProbeView::new("b", "second", EventLog::new());
    renderer.try_set_view(as_view(&first), None).await.unwrap();

    let observed: Mutex<Option<Arc<dyn TextView>>> = Mutex::new(None);
    renderer
        .try_set_view(
            as_view(&second),
            Some(Box::new(|old| {
                *observed.lock().unwrap() = Some(old);
            })),
        )
        .await
        .unwrap();

    let observed = observed.into_inner().unwrap().unwrap();
    assert!(Arc::ptr_eq(&observed, &as_view(&first)));
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_close_keeps_the_old_view_rendering() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let first = ProbeView::new("a", "first", EventLog::new());
    let second = ProbeView::new("b", "second", EventLog::new());
    renderer.try_set_view(as_view(&first), None).await.unwrap();
    settle().await;

    first.fail_closing();
    let result = renderer.try_set_view(as_view(&second), None).await;
    assert!(matches!(result, Err(SetViewError::Closing(_))));
    assert!(Arc::ptr_eq(&renderer.current_view(), &as_view(&first)));
    assert_eq!(second.shown(), 0);

    // The loop was woken back up and still serves the old view.
    assert!(first.invalidater().unwrap().invalidate());
    settle().await;
    assert_eq!(first.draws(), 2);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_show_still_installs_the_new_view() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let first = ProbeView::new("a", "first", EventLog::new());
    let second = ProbeView::new("b", "second", EventLog::new());
    second.fail_showing();
    renderer.try_set_view(as_view(&first), None).await.unwrap();

    let result = renderer.try_set_view(as_view(&second), None).await;
    assert!(matches!(result, Err(SetViewError::Showing(_))));
    assert!(Arc::ptr_eq(&renderer.current_view(), &as_view(&second)));
    assert_eq!(first.closed(), 1);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn draw_fault_halts_the_loop_by_default() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;

    view.fail_draw(true);
    let invalidater = view.invalidater().unwrap();
    invalidater.invalidate();
    settle().await;

    // The fault sentinel replaced the view and its invalidater was retired.
    assert!(!Arc::ptr_eq(&renderer.current_view(), &as_view(&view)));
    assert!(!invalidater.invalidate());
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn fault_handler_can_keep_the_loop_running() {
    let (renderer, _device) = renderer(Duration::ZERO);
    let faults = Arc::new(Mutex::new(Vec::new()));
    {
        let faults = faults.clone();
        renderer.set_fault_handler(move |fault| {
            faults.lock().unwrap().push(fault.error.to_string());
            FaultAction::Continue
        });
    }
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;

    view.fail_draw(true);
    view.invalidater().unwrap().invalidate();
    settle().await;
    assert!(Arc::ptr_eq(&renderer.current_view(), &as_view(&view)));
    assert_eq!(faults.lock().unwrap().len(), 1);

    view.fail_draw(false);
    view.invalidater().unwrap().invalidate();
    settle().await;
    assert_eq!(view.draws(), 2);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn device_failure_surfaces_as_flush_fault() {
    let (renderer, device) = renderer(Duration::ZERO);
    let faults = Arc::new(Mutex::new(Vec::new()));
    {
        let faults = faults.clone();
        renderer.set_fault_handler(move |fault| {
            faults.lock().unwrap().push(fault.error.to_string());
            FaultAction::Halt
        });
    }
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    device.fail_writes(true);
    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;

    let recorded = faults.lock().unwrap().clone();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].contains("injected write failure"), "unexpected fault: {}", recorded[0]);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn transition_during_pacing_skips_the_stale_draw() {
    let (renderer, _device) = renderer(Duration::from_millis(200));
    renderer.start().unwrap();
    let first = ProbeView::new("a", "first", EventLog::new());
    let second = ProbeView::new("b", "second", EventLog::new());

    renderer.try_set_view(as_view(&first), None).await.unwrap();
    settle().await;
    assert_eq!(first.draws(), 1);

    // Queue a redraw, then replace the view while the pacing delay runs.
    first.invalidater().unwrap().invalidate();
    tokio::time::sleep(Duration::from_millis(50)).await;
    renderer.try_set_view(as_view(&second), None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(first.draws(), 1);
    assert_eq!(second.draws(), 1);
    renderer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_retires_the_current_view() {
    let (renderer, _device) = renderer(Duration::ZERO);
    renderer.start().unwrap();
    let view = ProbeView::new("a", "hello", EventLog::new());
    renderer.try_set_view(as_view(&view), None).await.unwrap();
    settle().await;

    renderer.shutdown().await;
    let invalidater = view.invalidater().unwrap();
    assert!(!invalidater.invalidate());
    assert!(!Arc::ptr_eq(&renderer.current_view(), &as_view(&view)));
    settle().await;
    assert_eq!(view.draws(), 1);
}
