//! Rolling statistics for benchmark metric streams.
//!
//! [`MetricSeries`] summarizes a stream of observations in O(1) memory:
//! only count, running sum, minimum, and maximum are retained. The raw
//! samples are never stored, so a multi-hour run costs the same as a
//! ten-frame one. [`FpsWindow`] keeps a short window of recent frame
//! intervals for a smoothed live FPS readout.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// O(1) accumulator over a stream of numeric observations.
#[derive(Debug, Clone, Default)]
pub struct MetricSeries {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

/// Point-in-time summary of a [`MetricSeries`].
///
/// `minimum`/`maximum` are absent rather than a sentinel value when no
/// observations were made; `average` reports 0 in that case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: u64,
    pub average: f64,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl MetricSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Non-finite values are ignored so a single
    /// bad read cannot poison min/max/sum for the whole run.
    pub fn observe(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    /// Number of observations recorded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Summarize the series. Never divides by zero.
    pub fn snapshot(&self) -> MetricSummary {
        if self.count == 0 {
            return MetricSummary {
                count: 0,
                average: 0.0,
                minimum: None,
                maximum: None,
            };
        }
        MetricSummary {
            count: self.count,
            average: self.sum / self.count as f64,
            minimum: Some(self.min),
            maximum: Some(self.max),
        }
    }
}

impl MetricSummary {
    /// Empty summary (count = 0).
    pub fn empty() -> Self {
        MetricSeries::new().snapshot()
    }
}

/// Default number of frame intervals in the rolling FPS window.
pub const DEFAULT_FPS_WINDOW: usize = 30;

/// Rolling-window FPS counter for live progress display.
///
/// Tracks the intervals between the last N frames; the reported FPS is the
/// reciprocal of their mean, which smooths out single-frame jitter. The
/// persisted FPS metric is computed per frame from inference latency — this
/// window only feeds the console readout.
#[derive(Debug)]
pub struct FpsWindow {
    intervals: VecDeque<f64>,
    capacity: usize,
    last_frame: Option<Instant>,
    started: Option<Instant>,
    frames: u64,
}

impl FpsWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            intervals: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            last_frame: None,
            started: None,
            frames: 0,
        }
    }

    /// Mark the start of the measured run.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.started = Some(now);
        self.last_frame = Some(now);
        self.frames = 0;
        self.intervals.clear();
    }

    /// Record one processed frame and return the current windowed FPS.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            if self.intervals.len() == self.capacity {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.duration_since(last).as_secs_f64());
        }
        self.last_frame = Some(now);
        self.frames += 1;
        self.fps()
    }

    /// Current FPS over the rolling window, 0 before the first interval.
    pub fn fps(&self) -> f64 {
        if self.intervals.is_empty() {
            return 0.0;
        }
        let mean = self.intervals.iter().sum::<f64>() / self.intervals.len() as f64;
        if mean > 0.0 { 1.0 / mean } else { 0.0 }
    }

    /// Overall frames-per-second since [`start`](Self::start).
    pub fn overall_fps(&self) -> f64 {
        let Some(started) = self.started else {
            return 0.0;
        };
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Total frames recorded since [`start`](Self::start).
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FpsWindow {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn snapshot_matches_arithmetic_mean() {
        let values = [3.5, 1.0, 8.25, 4.0, 2.75];
        let mut series = MetricSeries::new();
        for v in values {
            series.observe(v);
        }

        let snap = series.snapshot();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert_eq!(snap.count, values.len() as u64);
        assert!((snap.average - mean).abs() < 1e-12);
        assert_eq!(snap.minimum, Some(1.0));
        assert_eq!(snap.maximum, Some(8.25));
    }

    #[test]
    fn empty_series_reports_zero_without_error() {
        let snap = MetricSeries::new().snapshot();
        assert_eq!(snap.count, 0);
        assert_eq!(snap.average, 0.0);
        assert!(snap.minimum.is_none());
        assert!(snap.maximum.is_none());
    }

    #[test]
    fn single_observation_is_its_own_min_and_max() {
        let mut series = MetricSeries::new();
        series.observe(42.0);
        let snap = series.snapshot();
        assert_eq!(snap.minimum, Some(42.0));
        assert_eq!(snap.maximum, Some(42.0));
        assert_eq!(snap.average, 42.0);
    }

    #[test]
    fn non_finite_observations_are_ignored() {
        let mut series = MetricSeries::new();
        series.observe(1.0);
        series.observe(f64::NAN);
        series.observe(f64::INFINITY);
        series.observe(3.0);
        let snap = series.snapshot();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.average, 2.0);
    }

    #[test]
    fn min_bounds_every_sample_once_nonempty() {
        let mut series = MetricSeries::new();
        let values = [5.0, -2.0, 7.5, 0.0];
        for v in values {
            series.observe(v);
        }
        let snap = series.snapshot();
        let min = snap.minimum.unwrap();
        let max = snap.maximum.unwrap();
        for v in values {
            assert!(min <= v && v <= max);
        }
    }

    #[test]
    fn metric_summary_serde_roundtrip() {
        let mut series = MetricSeries::new();
        series.observe(10.0);
        series.observe(20.0);
        let snap = series.snapshot();

        let json = serde_json::to_string(&snap).expect("serialize summary");
        let restored: MetricSummary = serde_json::from_str(&json).expect("deserialize summary");
        assert_eq!(snap, restored);
    }

    #[test]
    fn fps_window_reports_zero_before_any_interval() {
        let mut window = FpsWindow::new(5);
        window.start();
        assert_eq!(window.fps(), 0.0);
        // The first tick measures the interval since start().
        let fps = window.tick();
        assert!(fps >= 0.0);
        assert_eq!(window.frames(), 1);
    }

    #[test]
    fn fps_window_is_bounded() {
        let mut window = FpsWindow::new(3);
        window.start();
        for _ in 0..10 {
            window.tick();
        }
        assert!(window.intervals.len() <= 3);
        assert_eq!(window.frames(), 10);
    }
}
