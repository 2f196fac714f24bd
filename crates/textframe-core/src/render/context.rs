//! The deferred-instruction buffer views draw into.

use std::{fmt, sync::Arc};

use crate::device::{DeviceError, Point, Size, TextDisplayDevice};

/// One deferred device operation recorded by a draw call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderInstruction {
    /// Write text at the cursor position.
    Write(String),
    /// Write text followed by a line break.
    WriteLine(String),
    /// Clear the display.
    Clear,
    /// Move the cursor to the top-left corner.
    Home,
    /// Move the cursor to an absolute position.
    SetPosition {
        /// Column.
        x: u16,
        /// Row.
        y: u16,
    },
    /// Move the cursor by a relative offset.
    Move(i16),
}

impl RenderInstruction {
    /// Applies this instruction to a device.
    pub fn apply(&self, device: &dyn TextDisplayDevice) -> Result<(), DeviceError> {
        match self {
            Self::Write(text) => device.write(text),
            Self::WriteLine(text) => device.write_line(text),
            Self::Clear => device.clear(),
            Self::Home => device.home(),
            Self::SetPosition { x, y } => device.set_position(*x, *y),
            Self::Move(offset) => device.move_cursor(*offset),
        }
    }
}

/// An ordered buffer of deferred device instructions.
///
/// A view's draw call appends instructions; the render loop flushes them to
/// the device and resets the buffer before the next draw begins. Size and
/// cursor accessors pass straight through to the device, as do the cursor
/// enable/blink setters.
pub struct RenderingContext {
    device: Arc<dyn TextDisplayDevice>,
    instructions: Vec<RenderInstruction>,
}

impl RenderingContext {
    /// Creates a context for the given device.
    pub fn new(device: Arc<dyn TextDisplayDevice>) -> Self {
        Self { device, instructions: Vec::new() }
    }

    /// The display size in characters.
    pub fn size(&self) -> Size {
        self.device.size()
    }

    /// The current cursor position.
    pub fn cursor_position(&self) -> Point {
        self.device.cursor_position()
    }

    /// Returns whether the cursor is visible.
    pub fn cursor_enabled(&self) -> bool {
        self.device.cursor_enabled()
    }

    /// Shows or hides the cursor. Applied immediately, not deferred.
    pub fn set_cursor_enabled(&self, enabled: bool) -> Result<(), DeviceError> {
        self.device.set_cursor_enabled(enabled)
    }

    /// Returns whether the cursor blinks.
    pub fn cursor_blinking(&self) -> bool {
        self.device.cursor_blinking()
    }

    /// Enables or disables cursor blinking. Applied immediately, not deferred.
    pub fn set_cursor_blinking(&self, blinking: bool) -> Result<(), DeviceError> {
        self.device.set_cursor_blinking(blinking)
    }

    /// Defers writing text at the cursor position.
    pub fn write(&mut self, text: impl Into<String>) {
        self.instructions.push(RenderInstruction::Write(text.into()));
    }

    /// Defers writing text followed by a line break.
    pub fn write_line(&mut self, text: impl Into<String>) {
        self.instructions.push(RenderInstruction::WriteLine(text.into()));
    }

    /// Defers writing formatted text.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.instructions.push(RenderInstruction::Write(args.to_string()));
    }

    /// Defers writing formatted text followed by a line break.
    pub fn write_line_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.instructions.push(RenderInstruction::WriteLine(args.to_string()));
    }

    /// Defers clearing the display.
    pub fn clear(&mut self) {
        self.instructions.push(RenderInstruction::Clear);
    }

    /// Defers moving the cursor to the top-left corner.
    pub fn home(&mut self) {
        self.instructions.push(RenderInstruction::Home);
    }

    /// Defers moving the cursor to an absolute position.
    pub fn set_position(&mut self, x: u16, y: u16) {
        self.instructions.push(RenderInstruction::SetPosition { x, y });
    }

    /// Defers moving the cursor by a relative offset.
    pub fn move_cursor(&mut self, offset: i16) {
        self.instructions.push(RenderInstruction::Move(offset));
    }

    /// The buffered instructions, in draw order.
    pub fn instructions(&self) -> &[RenderInstruction] {
        &self.instructions
    }

    /// The number of buffered instructions.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Drops all buffered instructions.
    pub fn reset(&mut self) {
        self.instructions.clear();
    }

    pub(crate) fn device(&self) -> &Arc<dyn TextDisplayDevice> {
        &self.device
    }
}

impl fmt::Debug for RenderingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderingContext")
            .field("instructions", &self.instructions)
            .finish_non_exhaustive()
    }
}
