//! Edgebench: inference benchmarking harness for single-board computers.
//!
//! Measures inference latency and system resource usage (CPU, memory,
//! temperature, throttling) for object-detection models, then diffs the
//! results of two runs.
//!
//! # Architecture
//!
//! One synchronous measurement loop feeds two kinds of accumulators:
//! - **Per-frame metrics**: inference latency and instantaneous FPS go
//!   into O(1) rolling statistics (`stats`)
//! - **System samples**: CPU/memory/temperature/throttling snapshots are
//!   captured at a fixed cadence (`monitor`)
//!
//! The run loop (`runner`) assembles both into an immutable
//! [`BenchmarkResult`], which `report` persists as a JSON record plus a
//! text log. `compare` diffs two records into a ranked
//! [`ComparisonReport`]. Model execution sits behind the
//! [`Detector`](detector::Detector) trait (`ort`-backed in production);
//! frame acquisition sits behind [`FrameSource`](source::FrameSource).

pub mod bench_dirs;
pub mod compare;
pub mod config;
pub mod detector;
pub mod error;
pub mod monitor;
pub mod report;
pub mod runner;
pub mod source;
pub mod stats;

pub use compare::{ComparisonReport, MetricDirection};
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use monitor::{SystemSample, SystemSampler};
pub use runner::{BenchmarkResult, BenchmarkRunner, RunMode, RunState};
pub use stats::{MetricSeries, MetricSummary};
