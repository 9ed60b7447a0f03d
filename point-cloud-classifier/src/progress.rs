//! Terminal progress reporting for classification runs.
use crate::job::JobObserver;
use indicatif::{ProgressBar, ProgressStyle};

/// Draws run progress as a percentage bar and shows status lines as its message.
pub struct ProgressBarObserver {
    pb: ProgressBar,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.green/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("▉▊▋▌▍▎▏ ");
        pb.set_style(style);
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish();
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl JobObserver for ProgressBarObserver {
    fn on_progress(&mut self, percent: f64) {
        self.pb.set_position(percent.floor() as u64);
    }

    fn on_status(&mut self, message: &str) {
        log::info!("{message}");
        self.pb.set_message(message.to_string());
    }
}
