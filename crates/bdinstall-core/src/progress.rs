//! Run progress tracking.
//!
//! A single percentage that only moves forward during a run. Each pipeline
//! step owns a slice of the range ending at its ceiling and spreads that slice
//! evenly over the units of work it performs.

use std::fmt;
use std::sync::Arc;

pub const STOP_PROCESSES_PROGRESS: f64 = 10.0;
pub const MAKE_DIRECTORIES_PROGRESS: f64 = 20.0;
pub const CHECK_LEGACY_PROGRESS: f64 = 30.0;
pub const TRANSFER_LEGACY_PROGRESS: f64 = 40.0;
pub const DOWNLOAD_PACKAGE_PROGRESS: f64 = 60.0;
pub const INJECT_SHIMS_PROGRESS: f64 = 80.0;
pub const SWAP_ARCHIVES_PROGRESS: f64 = 90.0;
pub const RESTART_PROCESSES_PROGRESS: f64 = 100.0;

/// Observer notified synchronously with every accepted progress value.
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

#[derive(Default)]
pub struct ProgressTracker {
    value: f64,
    sink: Option<ProgressSink>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("value", &self.value)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: ProgressSink) -> Self {
        Self {
            value: 0.0,
            sink: Some(sink),
        }
    }

    pub fn get(&self) -> f64 {
        self.value
    }

    /// Move to `value`, clamped to `[0, 100]`. Values at or below the current
    /// one are ignored.
    pub fn set(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        let value = value.clamp(0.0, 100.0);
        if value <= self.value {
            return;
        }
        self.value = value;
        self.notify();
    }

    /// Back to zero. Only called when a new run starts.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.notify();
    }

    /// Open a budget from the current value up to `ceiling`, split over `units`.
    pub fn step(&mut self, ceiling: f64, units: usize) -> StepProgress<'_> {
        let ceiling = ceiling.clamp(self.value, 100.0);
        let per_unit = (ceiling - self.value) / units.max(1) as f64;
        StepProgress {
            tracker: self,
            ceiling,
            per_unit,
        }
    }

    fn notify(&self) {
        tracing::trace!(progress = self.value, "progress updated");
        if let Some(sink) = &self.sink {
            sink(self.value);
        }
    }
}

/// Write handle a step uses to report its own advancement.
#[derive(Debug)]
pub struct StepProgress<'a> {
    tracker: &'a mut ProgressTracker,
    ceiling: f64,
    per_unit: f64,
}

impl StepProgress<'_> {
    /// One unit of work done.
    pub fn tick(&mut self) {
        let next = (self.tracker.value + self.per_unit).min(self.ceiling);
        self.tracker.set(next);
    }

    pub fn per_unit(&self) -> f64 {
        self.per_unit
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn current(&self) -> f64 {
        self.tracker.value
    }

    /// Snap to the ceiling once the step has fully completed.
    pub fn finish(self) {
        self.tracker.set(self.ceiling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_tracker() -> (ProgressTracker, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let tracker = ProgressTracker::with_sink(Arc::new(move |v| {
            sink_seen.lock().unwrap().push(v);
        }));
        (tracker, seen)
    }

    #[test]
    fn set_never_moves_backwards() {
        let (mut tracker, seen) = recording_tracker();
        tracker.set(40.0);
        tracker.set(20.0);
        tracker.set(40.0);
        tracker.set(250.0);

        assert_eq!(tracker.get(), 100.0);
        assert_eq!(*seen.lock().unwrap(), vec![40.0, 100.0]);
    }

    #[test]
    fn set_ignores_nan() {
        let mut tracker = ProgressTracker::new();
        tracker.set(10.0);
        tracker.set(f64::NAN);
        assert_eq!(tracker.get(), 10.0);
    }

    #[test]
    fn step_divides_budget_evenly() {
        let mut tracker = ProgressTracker::new();
        tracker.set(10.0);

        let mut step = tracker.step(20.0, 4);
        assert_eq!(step.per_unit(), 2.5);
        for _ in 0..4 {
            step.tick();
        }
        assert_eq!(step.current(), 20.0);
        step.tick();
        assert_eq!(tracker.get(), 20.0);
    }

    #[test]
    fn step_with_zero_units_finishes_at_ceiling() {
        let mut tracker = ProgressTracker::new();
        let step = tracker.step(60.0, 0);
        step.finish();
        assert_eq!(tracker.get(), 60.0);
    }

    #[test]
    fn reset_returns_to_zero() {
        let (mut tracker, seen) = recording_tracker();
        tracker.set(90.0);
        tracker.reset();

        assert_eq!(tracker.get(), 0.0);
        assert_eq!(*seen.lock().unwrap(), vec![90.0, 0.0]);
    }
}
