//! Console demo: a clock view with a scrolling banner and a help page,
//! navigated with single key presses.
//!
//! # Usage
//!
//! ```bash
//! textframe-demo --refresh-ms 50 --log-level warn
//! ```
//!
//! Keys: `n` opens the help page, `b` navigates back, `q` quits.

mod views;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use textframe_console::ConsoleDisplayDevice;
use textframe_core::{
    IdleMonitor, InputEvent, InputManager, TextViewNavigator, TextViewRenderer,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::views::{ClockView, HelpView};

/// Textframe console demo
#[derive(Parser, Debug)]
#[command(name = "textframe-demo")]
#[command(about = "Clock and help views rendered on the terminal")]
#[command(version)]
struct Args {
    /// Render refresh interval in milliseconds
    #[arg(long, default_value = "50")]
    refresh_ms: u64,

    /// Seconds of input silence before the display is considered idle
    #[arg(long, default_value = "10")]
    input_idle_secs: u64,

    /// Seconds of total silence before the system is considered idle
    #[arg(long, default_value = "30")]
    system_idle_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    // Logs go to stderr; stdout belongs to the display device.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let device = Arc::new(ConsoleDisplayDevice::new());
    let renderer =
        Arc::new(TextViewRenderer::new(device, Duration::from_millis(args.refresh_ms)));
    let input = Arc::new(InputManager::new());
    let navigator = Arc::new(TextViewNavigator::new(Arc::clone(&renderer), Arc::clone(&input)));

    let idle = IdleMonitor::new(
        Duration::from_secs(args.input_idle_secs),
        Duration::from_secs(args.system_idle_secs),
    );
    idle.add_input_source(&*input);
    let mut idle_events = idle.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = idle_events.recv().await {
            tracing::info!(?event, "idle state changed");
        }
    });
    idle.start();

    enable_raw_mode()?;
    renderer.start()?;
    navigator.navigate_to(ClockView::new(), None).await?;

    let keys: Arc<InputEvent<char>> = Arc::new(input.create_event());
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    keys.register(move |key| {
        let _ = command_tx.send(*key);
    });

    let reader = {
        let input = Arc::clone(&input);
        let keys = Arc::clone(&keys);
        tokio::spawn(async move {
            let mut events = EventStream::new();
            while let Some(Ok(event)) = events.next().await {
                if let Event::Key(key) = event {
                    if key.kind == KeyEventKind::Press {
                        if let KeyCode::Char(character) = key.code {
                            input.raise(&keys, &character);
                        }
                    }
                }
            }
        })
    };

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            command = command_rx.recv() => {
                match command {
                    Some('q') | None => break,
                    Some('n') => {
                        if let Err(error) =
                            navigator.navigate_to_modal(HelpView::new(), None, Vec::new()).await
                        {
                            tracing::error!(%error, "navigation failed");
                        }
                    }
                    Some('b') => {
                        if let Err(error) = navigator.navigate_back(None).await {
                            tracing::error!(%error, "navigation failed");
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    }

    reader.abort();
    idle.shutdown();
    renderer.shutdown().await;
    disable_raw_mode()?;
    Ok(())
}
