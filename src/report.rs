//! Result record persistence and report rendering.
//!
//! Each run produces a pair of files under `<results_dir>/<model_name>/`:
//! a pretty-printed JSON record (the machine-readable [`BenchmarkResult`])
//! and a human-readable text log, both named
//! `<model_name>_<YYYY-MM-DD_HH-MM-SS>`. The timestamp format orders
//! lexicographically, which is what [`find_latest_record`] relies on.

use crate::compare::ComparisonReport;
use crate::error::{BenchError, Result};
use crate::runner::BenchmarkResult;
use crate::stats::MetricSummary;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Filename timestamp format; sorts chronologically as text.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Paths of one persisted run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecord {
    pub json_path: PathBuf,
    pub log_path: PathBuf,
}

/// Writes benchmark results into a per-model results directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    results_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// Persist `result` as a JSON record plus a text log.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or either file
    /// cannot be written.
    pub fn write(&self, result: &BenchmarkResult) -> Result<WrittenRecord> {
        let model_dir = self.results_dir.join(&result.model_name);
        std::fs::create_dir_all(&model_dir)?;

        let stamp = result.start_time.format(TIMESTAMP_FORMAT);
        let base = format!("{}_{stamp}", result.model_name);
        let json_path = model_dir.join(format!("{base}.json"));
        let log_path = model_dir.join(format!("{base}.log"));

        let json = serde_json::to_string_pretty(result)
            .map_err(|e| BenchError::Report(format!("failed to serialize result record: {e}")))?;
        std::fs::write(&json_path, json)?;
        std::fs::write(&log_path, render_text_report(result))?;

        info!(
            record = %json_path.display(),
            log = %log_path.display(),
            "result persisted"
        );
        Ok(WrittenRecord {
            json_path,
            log_path,
        })
    }
}

/// Load a JSON record written by [`ResultWriter::write`].
///
/// # Errors
///
/// Returns an error naming the path if the file is missing or malformed.
pub fn load_result(path: &Path) -> Result<BenchmarkResult> {
    if !path.is_file() {
        return Err(BenchError::Report(format!(
            "record file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| BenchError::Report(format!("failed to parse record {}: {e}", path.display())))
}

/// Find the most recent record for `model_name` under `results_dir`.
///
/// "Most recent" is the lexicographically greatest `.json` filename; the
/// timestamped naming scheme makes that the newest run. Explicit
/// replacement for scanning "the latest log file" out of ambient state.
///
/// # Errors
///
/// Returns an error if the model has no results directory or no records.
pub fn find_latest_record(results_dir: &Path, model_name: &str) -> Result<PathBuf> {
    let model_dir = results_dir.join(model_name);
    if !model_dir.is_dir() {
        return Err(BenchError::Report(format!(
            "no results directory for model \"{model_name}\" under {}",
            results_dir.display()
        )));
    }

    let mut newest: Option<PathBuf> = None;
    for entry in std::fs::read_dir(&model_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match newest {
            Some(ref current) if current.file_name() >= path.file_name() => {}
            _ => newest = Some(path),
        }
    }

    newest.ok_or_else(|| {
        BenchError::Report(format!(
            "no records for model \"{model_name}\" in {}",
            model_dir.display()
        ))
    })
}

/// Write a comparison report as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_comparison(report: &ComparisonReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| BenchError::Report(format!("failed to serialize comparison: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Render the human-readable run log.
pub fn render_text_report(result: &BenchmarkResult) -> String {
    let mut out = String::new();
    let rule = "=".repeat(78);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "BENCHMARK LOG - {}", result.model_name.to_uppercase());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Start Time:   {}", result.start_time.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "End Time:     {}", result.end_time.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Input Size:   {0}x{0}", result.input_size);
    let _ = writeln!(out, "Input Source: {}", result.input_source);
    let _ = writeln!(out, "State:        {:?}", result.state);
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\nSystem samples:");
    for sample in &result.system_samples {
        let mut line = format!("[{}]", sample.timestamp.format("%H:%M:%S"));
        if let Some(cpu) = sample.cpu_percent {
            let _ = write!(line, " CPU: {cpu:.1}%");
        }
        if let Some(mem) = sample.memory_percent {
            let _ = write!(line, " | RAM: {mem:.1}%");
        }
        if let Some(temp) = sample.temperature_celsius {
            let _ = write!(line, " | Temp: {temp:.1}C");
        }
        if sample.throttled == Some(true) {
            line.push_str(" | THROTTLED");
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "BENCHMARK SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Performance:");
    let _ = writeln!(out, "  Total Frames:       {}", result.total_frames);
    let _ = writeln!(out, "  Elapsed:            {:.1}s", result.elapsed_seconds);
    let _ = writeln!(out, "  Average FPS:        {:.2}", result.fps.average);
    let _ = writeln!(out, "  Min FPS:            {}", fmt_opt(result.fps.minimum, 2));
    let _ = writeln!(out, "  Max FPS:            {}", fmt_opt(result.fps.maximum, 2));
    let _ = writeln!(out, "  Avg Inference Time: {:.1}ms", result.inference_ms.average);
    let _ = writeln!(
        out,
        "  Min Inference Time: {}ms",
        fmt_opt(result.inference_ms.minimum, 1)
    );
    let _ = writeln!(
        out,
        "  Max Inference Time: {}ms",
        fmt_opt(result.inference_ms.maximum, 1)
    );

    let _ = writeln!(out, "System:");
    let _ = writeln!(out, "  Avg CPU:  {}", fmt_summary_pct(&result.system.cpu_percent));
    let _ = writeln!(out, "  Avg RAM:  {}", fmt_summary_pct(&result.system.memory_percent));
    if result.system.temperature_celsius.count > 0 {
        let _ = writeln!(
            out,
            "  Avg Temperature: {:.1}C",
            result.system.temperature_celsius.average
        );
        let _ = writeln!(
            out,
            "  Max Temperature: {}C",
            fmt_opt(result.system.temperature_celsius.maximum, 1)
        );
        if let Some(rise) = result.system.temperature_rise {
            let _ = writeln!(out, "  Temperature Rise: {rise:.1}C");
        }
    }
    if result.system.throttle_events > 0 {
        let _ = writeln!(out, "  Throttling Events: {}", result.system.throttle_events);
    }
    let _ = writeln!(out, "{rule}");

    out
}

/// Render the human-readable comparison report.
pub fn render_comparison_text(report: &ComparisonReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(78);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "BENCHMARK COMPARISON");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Comparing: {} vs {}\n", report.model_a, report.model_b);

    let _ = writeln!(
        out,
        "{:<22} {:>12} {:>12}   {:<12} {:>8}",
        "metric", report.model_a, report.model_b, "winner", "diff"
    );
    for row in &report.metrics {
        let _ = writeln!(
            out,
            "{:<22} {:>12.2} {:>12.2}   {:<12} {:>7.1}%",
            row.metric,
            row.value_a,
            row.value_b,
            row.winner.as_deref().unwrap_or("tie"),
            row.percent_difference
        );
    }

    let _ = writeln!(
        out,
        "\nThrottling events: {} {}, {} {}",
        report.model_a, report.throttle_events_a, report.model_b, report.throttle_events_b
    );
    let _ = writeln!(out, "Category wins:");
    for (model, count) in &report.wins {
        let _ = writeln!(out, "  {model:<14} {count}");
    }
    let _ = writeln!(
        out,
        "Overall winner: {}",
        report.overall_winner.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "{rule}");

    out
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_owned(),
    }
}

fn fmt_summary_pct(summary: &MetricSummary) -> String {
    if summary.count == 0 {
        return "n/a".to_owned();
    }
    format!(
        "{:.1}% (max {:.1}%)",
        summary.average,
        summary.maximum.unwrap_or(summary.average)
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::monitor::SystemSample;
    use crate::runner::{RunState, SystemSummary};
    use chrono::Utc;

    fn sample_result() -> BenchmarkResult {
        let mut fps = crate::stats::MetricSeries::new();
        let mut inference = crate::stats::MetricSeries::new();
        for latency in [48.0, 50.0, 52.0] {
            inference.observe(latency);
            fps.observe(1_000.0 / latency);
        }
        let samples = vec![SystemSample {
            timestamp: Utc::now(),
            cpu_percent: Some(62.0),
            memory_percent: Some(41.5),
            temperature_celsius: Some(51.2),
            throttled: Some(true),
        }];
        BenchmarkResult {
            model_name: "yolov8n".to_owned(),
            input_size: 640,
            input_source: "image test.jpg".to_owned(),
            state: RunState::Completed,
            start_time: Utc::now(),
            end_time: Utc::now(),
            elapsed_seconds: 0.15,
            total_frames: 3,
            fps: fps.snapshot(),
            inference_ms: inference.snapshot(),
            system: SystemSummary::from_samples(&samples),
            system_samples: samples,
        }
    }

    #[test]
    fn text_report_contains_header_and_summary() {
        let text = render_text_report(&sample_result());
        assert!(text.contains("BENCHMARK LOG - YOLOV8N"));
        assert!(text.contains("Total Frames:       3"));
        assert!(text.contains("THROTTLED"));
        assert!(text.contains("Throttling Events: 1"));
    }

    #[test]
    fn text_report_omits_missing_temperature() {
        let mut result = sample_result();
        result.system.temperature_celsius = MetricSummary::empty();
        result.system.temperature_rise = None;
        let text = render_text_report(&result);
        assert!(!text.contains("Avg Temperature"));
    }

    #[test]
    fn load_result_missing_file_names_the_path() {
        let err = load_result(Path::new("/nonexistent/run.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/run.json"));
    }

    #[test]
    fn latest_record_missing_model_dir_is_explicit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = find_latest_record(dir.path(), "ghost_model").unwrap_err();
        assert!(err.to_string().contains("ghost_model"));
    }

    #[test]
    fn latest_record_picks_newest_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_dir = dir.path().join("yolov8n");
        std::fs::create_dir_all(&model_dir).expect("mkdir");
        for stamp in [
            "2026-08-01_10-00-00",
            "2026-08-03_09-30-00",
            "2026-08-02_23-59-59",
        ] {
            std::fs::write(model_dir.join(format!("yolov8n_{stamp}.json")), "{}").expect("write");
        }
        // A stray non-record file is ignored.
        std::fs::write(model_dir.join("notes.txt"), "x").expect("write");

        let latest = find_latest_record(dir.path(), "yolov8n").expect("latest");
        assert!(
            latest
                .file_name()
                .unwrap()
                .to_string_lossy()
                .contains("2026-08-03_09-30-00")
        );
    }
}
