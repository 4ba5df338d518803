//! Terminal output for the `remote` command: spinner and colored status lines.
//!
//! Uses `indicatif` for the progress spinner and `console` for styling.

use std::path::PathBuf;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while a remote job is queued or running.
pub struct RemoteProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl RemoteProgress {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Reflect the latest poll in the spinner line.
    pub fn poll(&self, count: u32, status: &str) {
        let counter = self.dim.apply_to(format!("(poll #{count})"));
        self.pb.set_message(format!("Waiting for completion: {status} {counter}"));
    }

    pub fn success(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn failure(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}

/// List the files written by the `remote` command.
pub fn print_saved(paths: &[PathBuf]) {
    let dim = Style::new().dim();
    for path in paths {
        println!("    {} {}", dim.apply_to("→"), path.display());
    }
}
