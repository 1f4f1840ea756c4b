use log::{log_enabled, warn, Level};
use std::time::{Duration, Instant};

/// Scoped timer for tracing pipeline stages.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Emits a warning when a frame took longer than its budget.
pub fn warn_if_frame_budget_exceeded(label: &str, duration: Duration, budget_ms: f64) {
    let elapsed_ms = duration.as_secs_f64() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!("{label} exceeded frame budget: {elapsed_ms:.2} ms > {budget_ms:.2} ms");
    }
}
