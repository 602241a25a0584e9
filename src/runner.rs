//! Benchmark run loop.
//!
//! [`BenchmarkRunner`] drives a single-threaded measurement loop: acquire a
//! frame, time one inference, and at a coarser cadence capture a system
//! sample. The loop owns its metric series and sample list exclusively and
//! publishes them once, as an immutable [`BenchmarkResult`], when the run
//! ends. The deadline is only checked between frames, so an inference call
//! in flight always finishes and a duration-mode run may slightly overshoot
//! its configured length.

use crate::config::RunSettings;
use crate::detector::Detector;
use crate::error::{BenchError, Result};
use crate::monitor::{SystemSample, SystemSampler};
use crate::source::FrameSource;
use crate::stats::{FpsWindow, MetricSeries, MetricSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How a run decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run until the wall-clock deadline elapses.
    Duration(Duration),
    /// Run until this many frames have been processed.
    Iterations(u64),
}

/// Benchmark run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Not started.
    Idle,
    /// Loop in progress.
    Running,
    /// Configured duration or iteration target reached.
    Completed,
    /// Interrupted mid-run; the result covers the frames that succeeded.
    Partial,
    /// No frame could be processed at all; no result exists.
    Failed,
}

/// Aggregated system metrics for one run.
///
/// Metrics the platform never provided have summaries with `count = 0`;
/// the comparator treats those as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub cpu_percent: MetricSummary,
    pub memory_percent: MetricSummary,
    pub temperature_celsius: MetricSummary,
    /// Samples that reported active throttling or under-voltage.
    pub throttle_events: u64,
    /// Peak temperature minus the first reading, if any were taken.
    pub temperature_rise: Option<f64>,
}

impl SystemSummary {
    /// Aggregate a sample sequence.
    pub fn from_samples(samples: &[SystemSample]) -> Self {
        let mut cpu = MetricSeries::new();
        let mut memory = MetricSeries::new();
        let mut temperature = MetricSeries::new();
        let mut throttle_events = 0_u64;
        let mut first_temp = None;

        for sample in samples {
            if let Some(v) = sample.cpu_percent {
                cpu.observe(f64::from(v));
            }
            if let Some(v) = sample.memory_percent {
                memory.observe(f64::from(v));
            }
            if let Some(v) = sample.temperature_celsius {
                temperature.observe(f64::from(v));
                if first_temp.is_none() {
                    first_temp = Some(f64::from(v));
                }
            }
            if sample.throttled == Some(true) {
                throttle_events += 1;
            }
        }

        let temp_snapshot = temperature.snapshot();
        let temperature_rise = match (first_temp, temp_snapshot.maximum) {
            (Some(first), Some(max)) => Some(max - first),
            _ => None,
        };

        Self {
            cpu_percent: cpu.snapshot(),
            memory_percent: memory.snapshot(),
            temperature_celsius: temp_snapshot,
            throttle_events,
            temperature_rise,
        }
    }
}

/// The record of one benchmark run. Created once, written once, never
/// mutated after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub model_name: String,
    /// Square input resolution in pixels.
    pub input_size: u32,
    /// Description of the frame source that fed the run.
    pub input_source: String,
    pub state: RunState,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub total_frames: u64,
    /// Per-frame instantaneous FPS (1000 / latency_ms).
    pub fps: MetricSummary,
    /// Per-frame inference latency in milliseconds.
    pub inference_ms: MetricSummary,
    pub system: SystemSummary,
    pub system_samples: Vec<SystemSample>,
}

/// Per-frame progress passed to the run callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameProgress {
    /// 1-based frame number.
    pub frame: u64,
    /// Latency of this frame's inference in milliseconds.
    pub latency_ms: f64,
    /// Smoothed FPS over the rolling display window.
    pub windowed_fps: f64,
}

/// Drives one benchmark run.
pub struct BenchmarkRunner {
    mode: RunMode,
    sample_interval: Duration,
    warmup_iterations: usize,
    log_every_frames: u64,
    state: RunState,
}

impl BenchmarkRunner {
    pub fn new(mode: RunMode) -> Self {
        Self::from_settings(mode, &RunSettings::default())
    }

    pub fn from_settings(mode: RunMode, settings: &RunSettings) -> Self {
        Self {
            mode,
            sample_interval: Duration::from_millis(settings.sample_interval_ms.max(1)),
            warmup_iterations: settings.warmup_iterations,
            log_every_frames: settings.log_every_frames.max(1),
            state: RunState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the benchmark to completion. See [`Self::run_with_progress`].
    pub fn run(
        &mut self,
        detector: &mut dyn Detector,
        source: &mut dyn FrameSource,
    ) -> Result<BenchmarkResult> {
        self.run_with_progress(detector, source, &mut |_| {})
    }

    /// Run the benchmark, invoking `on_frame` after every processed frame.
    ///
    /// A source or inference failure after at least one successful frame
    /// ends the loop early with a `partial` result; a failure before any
    /// frame is fatal and returns the underlying error.
    ///
    /// # Errors
    ///
    /// Returns an error if warm-up fails or no frame at all could be
    /// processed.
    pub fn run_with_progress(
        &mut self,
        detector: &mut dyn Detector,
        source: &mut dyn FrameSource,
        on_frame: &mut dyn FnMut(FrameProgress),
    ) -> Result<BenchmarkResult> {
        self.state = RunState::Running;

        if self.warmup_iterations > 0 {
            if let Err(e) = detector.warmup(self.warmup_iterations) {
                self.state = RunState::Failed;
                return Err(BenchError::Model(format!("model warm-up failed: {e}")));
            }
        }

        match self.mode {
            RunMode::Duration(d) => {
                info!(model = detector.name(), duration_secs = d.as_secs(), "starting benchmark");
            }
            RunMode::Iterations(n) => {
                info!(model = detector.name(), iterations = n, "starting benchmark");
            }
        }

        let start_time = Utc::now();
        let started = Instant::now();

        let mut sampler = SystemSampler::new();
        let mut samples = vec![sampler.sample()];
        let mut last_sample = Instant::now();

        let mut fps_series = MetricSeries::new();
        let mut inference_series = MetricSeries::new();
        let mut fps_window = FpsWindow::default();
        fps_window.start();

        let mut frames = 0_u64;
        let mut input_size = 0_u32;
        let mut interruption: Option<BenchError> = None;

        loop {
            match self.mode {
                RunMode::Duration(d) if started.elapsed() >= d => break,
                RunMode::Iterations(n) if frames >= n => break,
                _ => {}
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    interruption = Some(BenchError::Source(format!(
                        "frame source {} exhausted",
                        source.describe()
                    )));
                    break;
                }
                Err(e) => {
                    interruption = Some(e);
                    break;
                }
            };
            input_size = frame.size;

            let frame_start = Instant::now();
            let inference = match detector.infer(&frame) {
                Ok(inference) => inference,
                Err(e) => {
                    interruption = Some(e);
                    break;
                }
            };
            let latency_ms = frame_start.elapsed().as_secs_f64() * 1_000.0;

            inference_series.observe(latency_ms);
            if latency_ms > 0.0 {
                fps_series.observe(1_000.0 / latency_ms);
            }

            frames += 1;
            let windowed_fps = fps_window.tick();
            on_frame(FrameProgress {
                frame: frames,
                latency_ms,
                windowed_fps,
            });

            if frames % self.log_every_frames == 0 {
                info!(
                    frame = frames,
                    fps = %format_args!("{windowed_fps:.2}"),
                    inference_ms = %format_args!("{latency_ms:.1}"),
                    candidates = inference.candidates,
                    "progress"
                );
            }

            if last_sample.elapsed() >= self.sample_interval {
                samples.push(sampler.sample());
                last_sample = Instant::now();
            }
        }

        if let Some(error) = interruption {
            if frames == 0 {
                self.state = RunState::Failed;
                return Err(error);
            }
            warn!(frames, %error, "run interrupted; emitting partial result");
            self.state = RunState::Partial;
        } else {
            self.state = RunState::Completed;
        }

        let end_time = Utc::now();
        let elapsed_seconds = started.elapsed().as_secs_f64();
        info!(
            frames,
            elapsed_secs = %format_args!("{elapsed_seconds:.1}"),
            state = ?self.state,
            "benchmark finished"
        );

        Ok(BenchmarkResult {
            model_name: detector.name().to_owned(),
            input_size,
            input_source: source.describe(),
            state: self.state,
            start_time,
            end_time,
            elapsed_seconds,
            total_frames: frames,
            fps: fps_series.snapshot(),
            inference_ms: inference_series.snapshot(),
            system: SystemSummary::from_samples(&samples),
            system_samples: samples,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Utc;

    fn sample(cpu: Option<f32>, temp: Option<f32>, throttled: Option<bool>) -> SystemSample {
        SystemSample {
            timestamp: Utc::now(),
            cpu_percent: cpu,
            memory_percent: Some(50.0),
            temperature_celsius: temp,
            throttled,
        }
    }

    #[test]
    fn summary_aggregates_present_fields_only() {
        let samples = vec![
            sample(None, Some(40.0), Some(false)),
            sample(Some(60.0), Some(44.0), Some(true)),
            sample(Some(80.0), Some(48.0), Some(true)),
        ];
        let summary = SystemSummary::from_samples(&samples);

        assert_eq!(summary.cpu_percent.count, 2);
        assert!((summary.cpu_percent.average - 70.0).abs() < 1e-9);
        assert_eq!(summary.memory_percent.count, 3);
        assert_eq!(summary.throttle_events, 2);
        assert_eq!(summary.temperature_rise, Some(8.0));
    }

    #[test]
    fn summary_of_no_samples_is_empty() {
        let summary = SystemSummary::from_samples(&[]);
        assert_eq!(summary.cpu_percent.count, 0);
        assert_eq!(summary.throttle_events, 0);
        assert!(summary.temperature_rise.is_none());
    }

    #[test]
    fn runner_starts_idle() {
        let runner = BenchmarkRunner::new(RunMode::Iterations(5));
        assert_eq!(runner.state(), RunState::Idle);
    }

    #[test]
    fn run_state_serializes_lowercase() {
        let json = serde_json::to_string(&RunState::Partial).expect("serialize");
        assert_eq!(json, "\"partial\"");
    }
}
