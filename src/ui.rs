//! Terminal presentation for the CLI binaries.
//!
//! Pretty output (spinners, progress bars) goes to stderr and only when it
//! is a terminal; anything that matters is still printed or logged in plain
//! mode, so piping output never loses information.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Copy, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    /// Announce a short-lived step. The returned guard reports completion
    /// (with duration) when dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
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

    /// Start a frame-by-frame progress display. `total` may be unknown for
    /// sources that only discover their length while playing.
    pub fn scan(&self, total: Option<u64>, label: &str) -> ScanProgress {
        if !self.use_pretty() {
            eprintln!("==> {}", label);
            return ScanProgress::new(None);
        }

        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                let style = ProgressStyle::with_template("{bar:32} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.enable_steady_tick(Duration::from_millis(120));
                let style = ProgressStyle::with_template("{spinner} {pos} frames {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner());
                bar.set_style(style);
                bar
            }
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_message(label.to_string());
        ScanProgress::new(Some(bar))
    }
}

// ----------------------------------------------------------------------------
// StageGuard
// ----------------------------------------------------------------------------

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
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

// ----------------------------------------------------------------------------
// ScanProgress
// ----------------------------------------------------------------------------

pub struct ScanProgress {
    bar: Option<ProgressBar>,
    processed: u64,
    start: Instant,
}

impl ScanProgress {
    fn new(bar: Option<ProgressBar>) -> Self {
        Self {
            bar,
            processed: 0,
            start: Instant::now(),
        }
    }

    /// Count one processed frame.
    pub fn tick(&mut self) {
        self.processed += 1;
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Stop the display and report what was done.
    pub fn finish(self) {
        let message = format!(
            "✔ {} frames ({})",
            self.processed,
            format_duration(self.start.elapsed())
        );
        match self.bar {
            Some(bar) => bar.finish_with_message(message),
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
