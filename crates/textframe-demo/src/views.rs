//! The demo's views: a live clock with a scrolling banner, and a modal help
//! page carrying an input target.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use textframe_core::animation::{ScrollMode, TextBlinker, TextScroller};
use textframe_core::{
    Activatable, CharacterContext, InputTarget, Invalidater, RenderingContext, TextView, ViewError,
};

const BANNER: &str = "textframe demo: n = help page, b = back, q = quit";

/// Shows the wall-clock time over a scrolling banner, with a blinking quit
/// hint.
pub struct ClockView {
    state: Mutex<Option<ClockState>>,
}

struct ClockState {
    scroller: TextScroller,
    blinker: TextBlinker,
}

impl ClockView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(None) })
    }
}

#[async_trait]
impl TextView for ClockView {
    async fn on_showing(
        &self,
        invalidater: Arc<Invalidater>,
        _character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError> {
        invalidater.create_interval(Duration::from_secs(1), Duration::from_secs(1));
        let scroller = TextScroller::new(
            &invalidater,
            ScrollMode::Restart,
            Duration::from_secs(1),
            Duration::from_millis(300),
            Duration::from_secs(1),
        );
        let blinker = TextBlinker::new(&invalidater, Duration::from_millis(700), true);
        if let Ok(mut state) = self.state.lock() {
            *state = Some(ClockState { scroller, blinker });
        }
        Ok(())
    }

    fn draw(&self, context: &mut RenderingContext) -> Result<(), ViewError> {
        let width = context.size().width as usize;
        context.home();
        context.write_line_fmt(format_args!("{:^width$}", clock_text()));
        if let Ok(mut state) = self.state.lock() {
            if let Some(state) = state.as_mut() {
                let banner = state.scroller.frame(BANNER, width).to_owned();
                context.write_line(banner);
                context.write(state.blinker.frame("q quits"));
            }
        }
        Ok(())
    }

    async fn on_closing(&self) -> Result<(), ViewError> {
        if let Ok(mut state) = self.state.lock() {
            *state = None;
        }
        Ok(())
    }
}

fn clock_text() -> String {
    let since_epoch =
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs();
    let in_day = since_epoch % 86_400;
    format!("{:02}:{:02}:{:02} UTC", in_day / 3600, in_day % 3600 / 60, in_day % 60)
}

/// Focus target of the help page; logs its focus changes.
#[derive(Default)]
pub struct HelpTarget;

impl Activatable for HelpTarget {
    fn on_activated(&self) {
        tracing::info!("help page gained focus");
    }

    fn on_deactivated(&self) {
        tracing::info!("help page lost focus");
    }
}

impl InputTarget for HelpTarget {
    fn as_activatable(&self) -> Option<&dyn Activatable> {
        Some(self)
    }
}

/// A static help page, shown modally so its target takes input focus.
pub struct HelpView {
    target: Arc<HelpTarget>,
}

impl HelpView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { target: Arc::new(HelpTarget) })
    }
}

#[async_trait]
impl TextView for HelpView {
    fn input_targets(&self) -> Option<Vec<Arc<dyn InputTarget>>> {
        Some(vec![self.target.clone()])
    }

    async fn on_showing(
        &self,
        _invalidater: Arc<Invalidater>,
        _character_context: Option<Arc<dyn CharacterContext>>,
    ) -> Result<(), ViewError> {
        Ok(())
    }

    fn draw(&self, context: &mut RenderingContext) -> Result<(), ViewError> {
        context.home();
        context.write_line("textframe demo");
        context.write_line("  n  open this help page");
        context.write_line("  b  go back");
        context.write_line("  q  quit");
        Ok(())
    }

    async fn on_closing(&self) -> Result<(), ViewError> {
        Ok(())
    }
}
