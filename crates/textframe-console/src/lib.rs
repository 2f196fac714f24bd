//! Console display driver.
//!
//! [`ConsoleDisplayDevice`] implements
//! [`TextDisplayDevice`](textframe_core::TextDisplayDevice) on top of the
//! process terminal via crossterm. The terminal has no programmable glyph
//! table, so [`try_character_context`](textframe_core::TextDisplayDevice::try_character_context)
//! returns `None`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::io::{Stdout, Write, stdout};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::QueueableCommand;
use crossterm::cursor::{DisableBlinking, EnableBlinking, Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use textframe_core::{CharacterContext, DeviceError, Point, Size, TextDisplayDevice};

const FALLBACK_SIZE: Size = Size::new(80, 24);

/// A [`TextDisplayDevice`] backed by the process terminal.
///
/// Writes are queued and flushed per call. The cursor flags are tracked
/// locally since the terminal cannot be queried for them.
pub struct ConsoleDisplayDevice {
    out: Mutex<Stdout>,
    cursor_enabled: AtomicBool,
    cursor_blinking: AtomicBool,
}

impl Default for ConsoleDisplayDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleDisplayDevice {
    /// Creates a device over the process stdout.
    pub fn new() -> Self {
        Self {
            out: Mutex::new(stdout()),
            cursor_enabled: AtomicBool::new(true),
            cursor_blinking: AtomicBool::new(true),
        }
    }

    fn with_out(
        &self,
        apply: impl FnOnce(&mut Stdout) -> Result<(), std::io::Error>,
    ) -> Result<(), DeviceError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| DeviceError::Unsupported("console output lock poisoned"))?;
        apply(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

impl TextDisplayDevice for ConsoleDisplayDevice {
    fn cursor_enabled(&self) -> bool {
        self.cursor_enabled.load(Ordering::SeqCst)
    }

    fn set_cursor_enabled(&self, enabled: bool) -> Result<(), DeviceError> {
        self.with_out(|out| {
            if enabled {
                out.queue(Show)?;
            } else {
                out.queue(Hide)?;
            }
            Ok(())
        })?;
        self.cursor_enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn cursor_blinking(&self) -> bool {
        self.cursor_blinking.load(Ordering::SeqCst)
    }

    fn set_cursor_blinking(&self, blinking: bool) -> Result<(), DeviceError> {
        self.with_out(|out| {
            if blinking {
                out.queue(EnableBlinking)?;
            } else {
                out.queue(DisableBlinking)?;
            }
            Ok(())
        })?;
        self.cursor_blinking.store(blinking, Ordering::SeqCst);
        Ok(())
    }

    fn size(&self) -> Size {
        match crossterm::terminal::size() {
            Ok((width, height)) => Size::new(width, height),
            Err(error) => {
                tracing::debug!(%error, "terminal size query failed, using fallback");
                FALLBACK_SIZE
            }
        }
    }

    fn cursor_position(&self) -> Point {
        crossterm::cursor::position().map(|(x, y)| Point::new(x, y)).unwrap_or_default()
    }

    fn try_character_context(&self) -> Option<std::sync::Arc<dyn CharacterContext>> {
        None
    }

    fn write(&self, text: &str) -> Result<(), DeviceError> {
        self.with_out(|out| {
            out.queue(Print(text))?;
            Ok(())
        })
    }

    fn write_line(&self, text: &str) -> Result<(), DeviceError> {
        self.with_out(|out| {
            out.queue(Print(text))?;
            out.queue(Print("\r\n"))?;
            Ok(())
        })
    }

    fn home(&self) -> Result<(), DeviceError> {
        self.with_out(|out| {
            out.queue(MoveTo(0, 0))?;
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), DeviceError> {
        self.with_out(|out| {
            out.queue(Clear(ClearType::All))?;
            out.queue(MoveTo(0, 0))?;
            Ok(())
        })
    }

    fn set_position(&self, x: u16, y: u16) -> Result<(), DeviceError> {
        self.with_out(|out| {
            out.queue(MoveTo(x, y))?;
            Ok(())
        })
    }

    fn move_cursor(&self, offset: i16) -> Result<(), DeviceError> {
        let width = self.size().width.max(1);
        let target = wrap_offset(self.cursor_position(), offset, width);
        self.set_position(target.x, target.y)
    }
}

/// Advances a cursor position by a linear offset, wrapping across lines.
fn wrap_offset(position: Point, offset: i16, width: u16) -> Point {
    let width = i32::from(width.max(1));
    let linear = i32::from(position.y) * width + i32::from(position.x) + i32::from(offset);
    let linear = linear.max(0);
    Point::new((linear % width) as u16, (linear / width).min(i32::from(u16::MAX)) as u16)
}
