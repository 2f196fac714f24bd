//! Display device boundary.
//!
//! Everything the framework knows about the physical output: a character grid
//! with a cursor, line-oriented writes, and optionally a custom-glyph table.
//! Concrete drivers (console, GPIO LCD chips) live in their own crates and
//! implement [`TextDisplayDevice`].

use std::{fmt, io, sync::Arc};

use thiserror::Error;

/// Display dimensions in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Columns.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

impl Size {
    /// Creates a size.
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// A cursor position, zero-based from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Errors reported by display devices.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The underlying output failed.
    #[error("device I/O error: {0}")]
    Io(#[from] io::Error),

    /// A custom character pattern did not match the device's glyph cell.
    #[error("invalid glyph pattern: expected {expected} bytes, got {actual}")]
    InvalidGlyphPattern {
        /// Bytes the device requires per glyph.
        expected: usize,
        /// Bytes supplied by the caller.
        actual: usize,
    },

    /// The device rejected an operation it does not support.
    #[error("unsupported device operation: {0}")]
    Unsupported(&'static str),
}

/// A character-addressable display device.
///
/// Implementations use interior mutability; the renderer drives a device
/// through a shared [`Arc`]. All write operations are applied in the order
/// the render loop flushes them.
pub trait TextDisplayDevice: Send + Sync {
    /// Returns whether the cursor is visible.
    fn cursor_enabled(&self) -> bool;

    /// Shows or hides the cursor.
    fn set_cursor_enabled(&self, enabled: bool) -> Result<(), DeviceError>;

    /// Returns whether the cursor blinks.
    fn cursor_blinking(&self) -> bool;

    /// Enables or disables cursor blinking.
    fn set_cursor_blinking(&self, blinking: bool) -> Result<(), DeviceError>;

    /// The display size in characters.
    fn size(&self) -> Size;

    /// The current cursor position.
    fn cursor_position(&self) -> Point;

    /// Returns the device's custom-glyph capability, if it has one.
    ///
    /// Plain consoles return `None`; character LCDs with a programmable
    /// glyph table return a context for defining custom characters.
    fn try_character_context(&self) -> Option<Arc<dyn CharacterContext>>;

    /// Writes text at the cursor position.
    fn write(&self, text: &str) -> Result<(), DeviceError>;

    /// Writes text followed by a line break.
    fn write_line(&self, text: &str) -> Result<(), DeviceError>;

    /// Writes formatted text at the cursor position.
    fn write_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), DeviceError> {
        self.write(&args.to_string())
    }

    /// Writes formatted text followed by a line break.
    fn write_line_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), DeviceError> {
        self.write_line(&args.to_string())
    }

    /// Moves the cursor to the top-left corner.
    fn home(&self) -> Result<(), DeviceError>;

    /// Clears the display.
    fn clear(&self) -> Result<(), DeviceError>;

    /// Moves the cursor to the given position.
    fn set_position(&self, x: u16, y: u16) -> Result<(), DeviceError>;

    /// Moves the cursor by a relative offset, wrapping across lines.
    fn move_cursor(&self, offset: i16) -> Result<(), DeviceError>;
}

/// Custom-glyph support for devices with a programmable character table.
pub trait CharacterContext: Send + Sync {
    /// The glyph cell dimensions in pixels.
    fn pattern_size(&self) -> Size;

    /// Programs a custom character at the given code point.
    ///
    /// `pattern` holds one byte per glyph row; its length must match the
    /// glyph cell height.
    fn set_custom_character(&self, code: u8, pattern: &[u8]) -> Result<(), DeviceError>;
}
