//! Terminal rendering of fetch and apply progress.

use chartsync_core::{Observer, PipelineState, Progress};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const STEPS: u64 = 1000;

/// Shows a spinner while the amount of work is unknown and a bar once it is.
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(STEPS);
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Removes the bar so the summary prints on a clean line.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{bar:40.cyan/blue}] {percent:>3}% {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl Observer for BarObserver {
    fn on_progress(&self, progress: Progress) {
        match progress {
            Progress::Indeterminate => self.bar.set_style(spinner_style()),
            Progress::Fraction(done) => {
                self.bar.set_style(bar_style());
                self.bar
                    .set_position((done.clamp(0.0, 1.0) * STEPS as f64).round() as u64);
            }
        }
    }

    fn on_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_transition(&self, state: &PipelineState) {
        tracing::debug!("Pipeline state: {:?}", state);
    }
}
