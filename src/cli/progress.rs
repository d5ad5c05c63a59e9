//! Terminal spinner fed by conversion status lines

use crate::convert::StatusSink;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing the latest status line
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A spinner that draws nothing, for quiet or machine-readable runs
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish_success(&self, message: &str) {
        self.bar.finish_with_message(format!("✓ {}", message));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("✗ {}", message));
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl StatusSink for Spinner {
    fn status(&self, message: &str) {
        // Warnings stay on screen, everything else just updates the spinner
        if message.starts_with("Warning:") {
            self.bar.println(format!("⚠️  {}", message.trim_start_matches("Warning:").trim()));
        } else {
            self.bar.set_message(message.to_string());
        }
    }
}
