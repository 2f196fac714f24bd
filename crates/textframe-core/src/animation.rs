//! Timer-driven text animations.
//!
//! Animations are pull-based: a view calls `frame` during its draw to get
//! the text for the current pass, and the animation's timer marks it dirty
//! and invalidates the view when the next frame is due. Between ticks,
//! `frame` keeps returning the same output.
//!
//! # Components
//!
//! - [`TextScroller`]: scrolls text wider than its window, bouncing or
//!   restarting at the end.
//! - [`TextBlinker`]: toggles text visibility at a fixed interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::render::{Invalidater, ViewTimer};

/// What a [`TextScroller`] does when the end of the text comes into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Scroll back and forth.
    Bounce,
    /// Jump back to the start and scroll again.
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

/// Scrolls text that is wider than its window.
///
/// While the text fits the window the timer stays stopped and the text is
/// only padded. When it overflows, the scroller waits `start_delay`, shifts
/// one character per `interval` tick, and pauses for `end_delay` at the far
/// end before bouncing or restarting per [`ScrollMode`].
pub struct TextScroller {
    mode: ScrollMode,
    start_delay: Duration,
    interval: Duration,
    end_delay: Duration,
    timer: Arc<ViewTimer>,
    dirty: Arc<AtomicBool>,
    text: String,
    width: usize,
    ticks: usize,
    direction: Direction,
    frame: String,
}

impl TextScroller {
    /// Creates a scroller drawing through the given invalidater.
    pub fn new(
        invalidater: &Arc<Invalidater>,
        mode: ScrollMode,
        start_delay: Duration,
        interval: Duration,
        end_delay: Duration,
    ) -> Self {
        let timer = invalidater.create_timer();
        let dirty = Arc::new(AtomicBool::new(true));
        {
            let dirty = Arc::clone(&dirty);
            let invalidater = Arc::clone(invalidater);
            timer.add_tick_listener(move || {
                dirty.store(true, Ordering::SeqCst);
                invalidater.invalidate();
            });
        }
        Self {
            mode,
            start_delay,
            interval,
            end_delay,
            timer,
            dirty,
            text: String::new(),
            width: 0,
            ticks: 0,
            direction: Direction::Right,
            frame: String::new(),
        }
    }

    /// Whether the next [`frame`](Self::frame) call will produce new output.
    pub fn is_changed(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Produces the frame of `text` for a window of `width` characters.
    ///
    /// Changing the text or width restarts the scroll from the left edge.
    pub fn frame(&mut self, text: &str, width: usize) -> &str {
        if self.text != text || self.width != width {
            self.text = text.to_owned();
            self.width = width;
            self.direction = Direction::Right;
            self.ticks = 0;

            if self.text.chars().count() > self.width {
                self.timer.start_with(self.start_delay, self.interval);
            } else {
                self.timer.stop();
            }

            self.update_frame();
            return &self.frame;
        }

        if self.dirty.swap(false, Ordering::SeqCst) {
            match self.direction {
                Direction::Left => {
                    if self.ticks > 0 {
                        self.ticks -= 1;
                        if self.ticks == 0 {
                            self.direction = Direction::Right;
                            self.timer.start_with(self.start_delay, self.interval);
                        }
                    }
                }
                Direction::Right => {
                    let remaining = self.remaining_length();
                    if remaining > self.width {
                        self.ticks += 1;
                        if self.remaining_length() == self.width {
                            if self.mode == ScrollMode::Bounce {
                                self.direction = Direction::Left;
                            }
                            self.timer.start_with(self.end_delay, self.interval);
                        }
                    } else if remaining == self.width && self.mode == ScrollMode::Restart {
                        self.ticks = 0;
                        self.timer.start_with(self.start_delay, self.interval);
                    }
                }
            }

            self.update_frame();
        }

        &self.frame
    }

    fn remaining_length(&self) -> usize {
        self.text.chars().count().saturating_sub(self.ticks)
    }

    fn update_frame(&mut self) {
        if self.text.is_empty() {
            self.frame.clear();
            return;
        }
        let mut frame: String = self.text.chars().skip(self.ticks).take(self.width).collect();
        let padding = self.width.saturating_sub(frame.chars().count());
        frame.extend(std::iter::repeat_n(' ', padding));
        self.frame = frame;
    }
}

/// Toggles text visibility at a fixed interval.
pub struct TextBlinker {
    interval: Duration,
    timer: Arc<ViewTimer>,
    dirty: Arc<AtomicBool>,
    text: String,
    showing: bool,
}

impl TextBlinker {
    /// Creates a blinker drawing through the given invalidater.
    pub fn new(invalidater: &Arc<Invalidater>, interval: Duration, enabled: bool) -> Self {
        let timer = invalidater.create_timer();
        let dirty = Arc::new(AtomicBool::new(true));
        {
            let dirty = Arc::clone(&dirty);
            let invalidater = Arc::clone(invalidater);
            timer.add_tick_listener(move || {
                dirty.store(true, Ordering::SeqCst);
                invalidater.invalidate();
            });
        }
        if enabled {
            timer.start_with(interval, interval);
        }
        Self { interval, timer, dirty, text: String::new(), showing: true }
    }

    /// Whether the next [`frame`](Self::frame) call will produce new output.
    pub fn is_changed(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Whether the blink timer is running.
    pub fn is_enabled(&self) -> bool {
        self.timer.is_enabled()
    }

    /// Starts or stops blinking. A disabled blinker shows its text steadily.
    pub fn set_enabled(&self, enabled: bool) {
        if self.timer.is_enabled() != enabled {
            self.dirty.store(true, Ordering::SeqCst);
            if enabled {
                self.timer.start_with(self.interval, self.interval);
            } else {
                self.timer.stop();
            }
        }
    }

    /// Produces the frame for `text`: the text itself in the visible phase,
    /// an equal run of spaces otherwise. New text always starts visible.
    pub fn frame(&mut self, text: &str) -> String {
        if self.dirty.swap(false, Ordering::SeqCst) {
            self.showing = !self.showing;
        }
        if self.text != text {
            self.text = text.to_owned();
            self.showing = true;
        }
        if self.showing {
            self.text.clone()
        } else {
            " ".repeat(self.text.chars().count())
        }
    }

    /// Forgets the current text and returns to the visible phase.
    pub fn reset(&mut self) {
        self.text.clear();
        self.showing = true;
    }
}
