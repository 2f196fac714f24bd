//! Test doubles for exercising the framework end to end.
//!
//! # Components
//!
//! - [`RecordingDisplayDevice`]: an in-memory display that records every
//!   operation applied to it, with optional write-failure injection.
//! - [`ProbeView`]: a view that counts its lifecycle hooks, records them in
//!   a shared [`EventLog`] and can be made to fail any hook.
//! - [`ProbeTarget`]: an input target counting focus changes.
//!
//! The doubles live in a library crate so the integration suites and any
//! downstream consumers share one set of instrumented fakes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use textframe_core::{
    Activatable, CharacterContext, DeviceError, InputTarget, Invalidater, Point, RenderingContext,
    Size, TextDisplayDevice, TextView, ViewError,
};

/// One operation applied to a [`RecordingDisplayDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedOp {
    /// Text written at the cursor.
    Write(String),
    /// Text written with a line break.
    WriteLine(String),
    /// The display was cleared.
    Clear,
    /// The cursor moved to the top-left corner.
    Home,
    /// The cursor moved to an absolute position.
    SetPosition(u16, u16),
    /// The cursor moved by a relative offset.
    Move(i16),
    /// Cursor visibility changed.
    CursorEnabled(bool),
    /// Cursor blinking changed.
    CursorBlinking(bool),
}

/// An in-memory display device recording everything applied to it.
pub struct RecordingDisplayDevice {
    size: Size,
    ops: Mutex<Vec<RecordedOp>>,
    fail_writes: AtomicBool,
    cursor_enabled: AtomicBool,
    cursor_blinking: AtomicBool,
}

impl RecordingDisplayDevice {
    /// Creates a device with the given dimensions.
    pub fn new(size: Size) -> Arc<Self> {
        Arc::new(Self {
            size,
            ops: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            cursor_enabled: AtomicBool::new(true),
            cursor_blinking: AtomicBool::new(true),
        })
    }

    /// Makes subsequent write operations fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// All operations recorded so far, in application order.
    pub fn ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    /// Drains and returns the recorded operations.
    pub fn take_ops(&self) -> Vec<RecordedOp> {
        self.ops.lock().map(|mut ops| ops.drain(..).collect()).unwrap_or_default()
    }

    /// Concatenated text of every write recorded so far.
    pub fn written_text(&self) -> String {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Write(text) | RecordedOp::WriteLine(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: RecordedOp) {
        if let Ok(mut ops) = self.ops.lock() {
            ops.push(op);
        }
    }

    fn check_write(&self) -> Result<(), DeviceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(io::Error::other("injected write failure")));
        }
        Ok(())
    }
}

impl TextDisplayDevice for RecordingDisplayDevice {
    fn cursor_enabled(&self) -> bool {
        self.cursor_enabled.load(Ordering::SeqCst)
    }

    fn set_cursor_enabled(&self, enabled: bool) -> Result<(), DeviceError> {
        self.cursor_enabled.store(enabled, Ordering::SeqCst);
        self.record(RecordedOp::CursorEnabled(enabled));
        Ok(())
    }

    fn cursor_blinking(&self) -> bool {
        self.cursor_blinking.load(Ordering::SeqCst)
    }

    fn set_cursor_blinking(&self, blinking: bool) -> Result<(), DeviceError> {
        self.cursor_blinking.store(blinking, Ordering::SeqCst);
        self.record(RecordedOp::CursorBlinking(blinking));
        Ok(())
    }

    fn size(&self) -> Size {
        self.size
    }

    fn cursor_position(&self) -> Point {
        Point::default()
    }

    fn try_character_context(&self) -> Option<Arc<dyn CharacterContext>> {
        None
    }

    fn write(&self, text: &str) -> Result<(), DeviceError> {
        self.check_write()?;
        self.record(RecordedOp::Write(text.to_owned()));
        Ok(())
    }

    fn write_line(&self, text: &str) -> Result<(), DeviceError> {
        self.check_write()?;
        self.record(RecordedOp::WriteLine(text.to_owned()));
        Ok(())
    }

    fn home(&self) -> Result<(), DeviceError> {
        self.record(RecordedOp::Home);
        Ok(())
    }

    fn clear(&self) -> Result<(), DeviceError> {
        self.record(RecordedOp::Clear);
        Ok(())
    }

    fn set_position(&self, x: u16, y: u16) -> Result<(), DeviceError> {
        self.record(RecordedOp::SetPosition(x, y));
        Ok(())
    }

    fn move_cursor(&self, offset: i16) -> Result<(), DeviceError> {
        self.record(RecordedOp::Move(offset));
        Ok(())
    }
}

/// An append-only log shared by test doubles for ordering assertions.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry.
    pub fn record(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.into());
        }
    }

    /// A snapshot of the entries in append order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Index of the first entry equal to `needle`, if present.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry == needle)
    }
}

/// A view instrumented for lifecycle assertions.
///
/// Every hook bumps a counter and appends `<label>:<hook>` to the shared
/// [`EventLog`]. Each hook can be made to fail.
pub struct ProbeView {
    label: String,
    text: String,
    log: EventLog,
    shown: AtomicUsize,
    closed: AtomicUsize,
    draws: AtomicUsize,
    fail_showing: AtomicBool,
    fail_closing: AtomicBool,
    fail_draw: AtomicBool,
    targets: Mutex<Vec<Arc<dyn InputTarget>>>,
    invalidater: Mutex<Option<Arc<Invalidater>>>,
}

impl ProbeView {
    /// Creates a view that draws `text` and logs under `label`.
    pub fn new(label: impl Into<String>, text: impl Into<String>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            text: text.into(),
            log,
            shown: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            draws: AtomicUsize::new(0),
            fail_showing: AtomicBool::new(false),
            fail_closing: AtomicBool::new(false),
            fail_draw: AtomicBool::new(false),
            targets: Mutex::new(Vec::new()),
            invalidater: Mutex::new(None),
        })
    }

    /// Makes the showing hook fail.
    pub fn fail_showing(&self) {
        self.fail_showing.store(true, Ordering::SeqCst);
    }

    /// Makes the closing hook fail.
    pub fn fail_closing(&self) {
        self.fail_closing.store(true, Ordering::SeqCst);
    }

    /// Makes the draw call fail.
    pub fn fail_draw(&self, fail: bool) {
        self.fail_draw.store(fail, Ordering::SeqCst);
    }

    /// Adds an input target reported by the view.
    pub fn add_target(&self, target: Arc<dyn InputTarget>) {
        if let Ok(mut targets) = self.targets.lock() {
            targets.push(target);
        }
    }

    /// Times the showing hook has run.
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    /// Times the closing hook has run.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Times the view has drawn.
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::SeqCst)
    }

    /// The invalidater captured from the latest showing hook.
    pub fn invalidater(&self) -> Option<Arc<Invalidater>> {
        self.invalidater.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl TextView for ProbeView {
    fn input_targets(&self) -> Option<Vec<Arc<dyn InputTarget>>> {
        let targets = self.targets.lock().map(|targets| targets.clone()).unwrap_or_default();
        if targets.is_empty() { None } else { Some(targets) }
    }

    async fn on_showing(
        &self,
        invalidater: Arc<Invalidater>,
        _character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError> {
        self.log.record(format!("{}:showing", self.label));
        self.shown.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.invalidater.lock() {
            *slot = Some(invalidater);
        }
        if self.fail_showing.load(Ordering::SeqCst) {
            return Err(format!("{} refused to show", self.label).into());
        }
        Ok(())
    }

    fn draw(&self, context: &mut RenderingContext) -> Result<(), ViewError> {
        if self.fail_draw.load(Ordering::SeqCst) {
            return Err(format!("{} refused to draw", self.label).into());
        }
        self.log.record(format!("{}:draw", self.label));
        self.draws.fetch_add(1, Ordering::SeqCst);
        context.home();
        context.write(self.text.clone());
        Ok(())
    }

    async fn on_closing(&self) -> Result<(), ViewError> {
        self.log.record(format!("{}:closing", self.label));
        if self.fail_closing.load(Ordering::SeqCst) {
            return Err(format!("{} refused to close", self.label).into());
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// An input target counting focus transitions.
#[derive(Default)]
pub struct ProbeTarget {
    activated: AtomicUsize,
    deactivated: AtomicUsize,
}

impl ProbeTarget {
    /// Creates a target.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Times the target gained focus.
    pub fn activations(&self) -> usize {
        self.activated.load(Ordering::SeqCst)
    }

    /// Times the target lost focus.
    pub fn deactivations(&self) -> usize {
        self.deactivated.load(Ordering::SeqCst)
    }

    /// Whether the target currently holds focus.
    pub fn is_active(&self) -> bool {
        self.activations() > self.deactivations()
    }
}

impl Activatable for ProbeTarget {
    fn on_activated(&self) {
        self.activated.fetch_add(1, Ordering::SeqCst);
    }

    fn on_deactivated(&self) {
        self.deactivated.fetch_add(1, Ordering::SeqCst);
    }
}

impl InputTarget for ProbeTarget {
    fn as_activatable(&self) -> Option<&dyn Activatable> {
        Some(self)
    }
}
