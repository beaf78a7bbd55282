//! Stderr stage reporting for the command line.
//!
//! Pretty mode draws indicatif spinners and a frame counter bar; plain mode
//! prints one `==> stage` line per stage. Nothing here touches stdout.

use std::io;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::progress::ProgressSink;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleMode {
    Auto,
    Plain,
    Pretty,
}

impl ConsoleMode {
    pub fn parse(flag: &str) -> Self {
        match flag {
            "plain" => ConsoleMode::Plain,
            "pretty" => ConsoleMode::Pretty,
            _ => ConsoleMode::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Console {
    mode: ConsoleMode,
    is_tty: bool,
}

impl Console {
    pub fn new(mode: ConsoleMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                ConsoleMode::Pretty | ConsoleMode::Auto => true,
                ConsoleMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Frame counter bar, in pretty mode only.
    pub fn frame_bar(&self, total: usize) -> Option<FrameBar> {
        if !self.pretty() || total == 0 {
            return None;
        }
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("  [{bar:30}] {pos}/{len} frames")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Some(FrameBar { bar })
    }
}

/// Progress sink that moves a terminal bar.
pub struct FrameBar {
    bar: ProgressBar,
}

impl ProgressSink for FrameBar {
    fn write(&mut self, completed: usize) -> io::Result<()> {
        self.bar.set_position(completed as u64);
        Ok(())
    }
}

impl Drop for FrameBar {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
