//! Progress and log sinks

use std::sync::Mutex;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Where orchestration progress and results are written.
///
/// Implementations must be safe to call from concurrent tasks.
pub trait Reporter: Send + Sync {
    fn write_line(&self, message: &str);

    /// Highlighted line for headings and final outcomes
    fn write_status_line(&self, message: &str);

    fn write_progress(&self, current: usize, total: usize, message: &str);

    fn clean_current_line(&self);

    /// Stop any in-place progress rendering
    fn stop_animation(&self);
}

const PROGRESS_TEMPLATE: &str = "[{bar:30.green}] {pos}/{len} {msg}";

/// Terminal reporter with a single progress bar below the printed lines
pub struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
    draw_target: fn() -> ProgressDrawTarget,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr)
    }

    pub fn with_draw_target(draw_target: fn() -> ProgressDrawTarget) -> Self {
        Self {
            bar: Mutex::new(None),
            draw_target,
        }
    }

    fn new_bar(&self, total: u64) -> ProgressBar {
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>.");
        let bar = ProgressBar::with_draw_target(Some(total), (self.draw_target)());
        bar.set_style(style);
        bar
    }

    fn println(&self, line: &str) {
        let bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match bar.as_ref() {
            Some(bar) => bar.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }

    /// Whether a progress bar is currently drawn
    pub fn is_animating(&self) -> bool {
        self.bar
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Reporter for ConsoleReporter {
    fn write_line(&self, message: &str) {
        self.println(message);
    }

    fn write_status_line(&self, message: &str) {
        self.println(&message.cyan().bold().to_string());
    }

    fn write_progress(&self, current: usize, total: usize, message: &str) {
        let mut bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        let bar = bar.get_or_insert_with(|| self.new_bar(total as u64));
        bar.set_length(total as u64);
        bar.set_position(current.min(total) as u64);
        bar.set_message(message.to_string());
    }

    fn clean_current_line(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish_and_clear();
        }
    }

    fn stop_animation(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish();
        }
    }
}
