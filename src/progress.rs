// Progress reporting.
// Sink for long-running install and update steps, with a scope guard that ends the operation.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress for one operation at a time.
pub trait ProgressSink: Send + Sync {
    fn start(&self, label: &str);
    fn update(&self, message: &str, current: u64, total: u64);
    fn finish(&self);
}

/// Started operation; calls [`ProgressSink::finish`] when dropped.
pub struct ProgressScope<'a> {
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressScope<'a> {
    pub fn begin(sink: &'a dyn ProgressSink, label: &str) -> Self {
        sink.start(label);
        Self { sink }
    }

    pub fn update(&self, message: &str, current: u64, total: u64) {
        self.sink.update(message, current, total);
    }
}

impl Drop for ProgressScope<'_> {
    fn drop(&mut self) {
        self.sink.finish();
    }
}

/// Writes progress to the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn start(&self, label: &str) {
        log::info!("{}", label);
    }

    fn update(&self, message: &str, current: u64, total: u64) {
        log::info!("[{}/{}] {}", current, total, message);
    }

    fn finish(&self) {}
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) =
            ProgressStyle::default_bar().template("{prefix:.bold} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, label: &str) {
        self.bar.reset();
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_prefix(label.to_string());
    }

    fn update(&self, message: &str, current: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(current);
        self.bar.set_message(message.to_string());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
