//! Scoped wall-clock timing.
//!
//! A [`ScopedTimer`] records the instant it was created and emits a
//! `tracing` event with the elapsed time when it is dropped, on every exit
//! path including early returns and `?` propagation.

use std::time::{Duration, Instant};

/// Guard that logs elapsed wall-clock time when dropped.
///
/// # Example
///
/// ```rust
/// use martingale_sim::engine::timer::ScopedTimer;
///
/// let total: u64 = {
///     let _timer = ScopedTimer::new("summing");
///     (0..1_000u64).sum()
/// };
/// assert_eq!(total, 499_500);
/// ```
#[derive(Debug)]
pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    /// Start timing a labelled scope.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    /// Label reported when the guard is dropped.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time elapsed since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        tracing::info!(
            label = %self.label,
            elapsed_ms = elapsed.as_millis() as u64,
            "{}: {} s.",
            self.label,
            elapsed.as_secs()
        );
    }
}
