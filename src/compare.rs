//! Benchmark result comparison.
//!
//! Diffs two [`BenchmarkResult`] records metric by metric. Which direction
//! "wins" is explicit per-metric configuration ([`MetricDirection`]), not a
//! hard-coded sign convention: FPS is better higher, latency and resource
//! metrics better lower. A metric required by the configuration but absent
//! from either record fails the comparison explicitly — a report silently
//! missing a row would be misleading.

use crate::config::MetricSpec;
use crate::error::{BenchError, Result};
use crate::runner::BenchmarkResult;
use crate::stats::MetricSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of a metric comparison is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricDirection {
    /// Larger values win (e.g. FPS).
    #[serde(rename = "higher")]
    HigherIsBetter,
    /// Smaller values win (e.g. latency, CPU, temperature).
    #[serde(rename = "lower")]
    LowerIsBetter,
}

/// The default compared metrics: throughput, latency, and the system
/// resource triple.
pub fn default_metrics() -> Vec<MetricSpec> {
    [
        ("fps", MetricDirection::HigherIsBetter),
        ("inference_ms", MetricDirection::LowerIsBetter),
        ("cpu_percent", MetricDirection::LowerIsBetter),
        ("memory_percent", MetricDirection::LowerIsBetter),
        ("temperature_celsius", MetricDirection::LowerIsBetter),
    ]
    .into_iter()
    .map(|(name, direction)| MetricSpec {
        name: name.to_owned(),
        direction,
    })
    .collect()
}

/// One compared metric row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub metric: String,
    pub direction: MetricDirection,
    pub value_a: f64,
    pub value_b: f64,
    /// Winning model name; `None` on an exact tie.
    pub winner: Option<String>,
    /// How far the winner beats the loser, relative to the loser, in
    /// percent. 0 on a tie or when the losing value is zero.
    pub percent_difference: f64,
}

/// Comparison of two benchmark records, ranked by percentage difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub model_a: String,
    pub model_b: String,
    pub generated_at: DateTime<Utc>,
    /// Rows sorted by descending percentage difference.
    pub metrics: Vec<MetricComparison>,
    /// Category wins per model.
    pub wins: BTreeMap<String, u64>,
    /// Model with strictly more category wins, if any.
    pub overall_winner: Option<String>,
    /// Throttled-sample counts, reported informationally.
    pub throttle_events_a: u64,
    pub throttle_events_b: u64,
}

/// Compare two records over the configured metric set.
///
/// # Errors
///
/// Returns [`BenchError::Compare`] if a configured metric name is unknown
/// or if either record has no observations for a configured metric.
pub fn compare(
    a: &BenchmarkResult,
    b: &BenchmarkResult,
    metrics: &[MetricSpec],
) -> Result<ComparisonReport> {
    let mut rows = Vec::with_capacity(metrics.len());
    for spec in metrics {
        let value_a = metric_average(a, &spec.name)?;
        let value_b = metric_average(b, &spec.name)?;
        rows.push(compare_metric(spec, a, b, value_a, value_b));
    }

    rows.sort_by(|x, y| {
        y.percent_difference
            .partial_cmp(&x.percent_difference)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut wins: BTreeMap<String, u64> = BTreeMap::new();
    wins.insert(a.model_name.clone(), 0);
    wins.insert(b.model_name.clone(), 0);
    for row in &rows {
        if let Some(ref winner) = row.winner {
            *wins.entry(winner.clone()).or_default() += 1;
        }
    }
    let overall_winner = overall_winner(&wins);

    Ok(ComparisonReport {
        model_a: a.model_name.clone(),
        model_b: b.model_name.clone(),
        generated_at: Utc::now(),
        metrics: rows,
        wins,
        overall_winner,
        throttle_events_a: a.system.throttle_events,
        throttle_events_b: b.system.throttle_events,
    })
}

fn compare_metric(
    spec: &MetricSpec,
    a: &BenchmarkResult,
    b: &BenchmarkResult,
    value_a: f64,
    value_b: f64,
) -> MetricComparison {
    let (winner, better, worse) = if value_a == value_b {
        (None, value_a, value_b)
    } else {
        let a_wins = match spec.direction {
            MetricDirection::HigherIsBetter => value_a > value_b,
            MetricDirection::LowerIsBetter => value_a < value_b,
        };
        if a_wins {
            (Some(a.model_name.clone()), value_a, value_b)
        } else {
            (Some(b.model_name.clone()), value_b, value_a)
        }
    };

    let percent_difference = if winner.is_none() || worse == 0.0 {
        0.0
    } else {
        ((better - worse) / worse * 100.0).abs()
    };

    MetricComparison {
        metric: spec.name.clone(),
        direction: spec.direction,
        value_a,
        value_b,
        winner,
        percent_difference,
    }
}

/// Resolve a metric's average from a record, failing explicitly when the
/// record never observed it.
fn metric_average(result: &BenchmarkResult, name: &str) -> Result<f64> {
    let summary = summary_for(result, name).ok_or_else(|| {
        BenchError::Compare(format!("unknown comparison metric \"{name}\""))
    })?;
    if summary.count == 0 {
        return Err(BenchError::Compare(format!(
            "record for {} is missing metric \"{name}\"",
            result.model_name
        )));
    }
    Ok(summary.average)
}

fn summary_for<'a>(result: &'a BenchmarkResult, name: &str) -> Option<&'a MetricSummary> {
    match name {
        "fps" => Some(&result.fps),
        "inference_ms" => Some(&result.inference_ms),
        "cpu_percent" => Some(&result.system.cpu_percent),
        "memory_percent" => Some(&result.system.memory_percent),
        "temperature_celsius" => Some(&result.system.temperature_celsius),
        _ => None,
    }
}

fn overall_winner(wins: &BTreeMap<String, u64>) -> Option<String> {
    let best = wins.values().copied().max()?;
    if best == 0 {
        return None;
    }
    let mut leaders = wins.iter().filter(|&(_, &count)| count == best);
    let leader = leaders.next()?;
    if leaders.next().is_some() {
        None
    } else {
        Some(leader.0.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::runner::{RunState, SystemSummary};

    fn summary(value: f64) -> MetricSummary {
        MetricSummary {
            count: 10,
            average: value,
            minimum: Some(value),
            maximum: Some(value),
        }
    }

    fn result(name: &str, fps: f64, inference_ms: f64, temp: Option<f64>) -> BenchmarkResult {
        let temperature = match temp {
            Some(v) => summary(v),
            None => MetricSummary::empty(),
        };
        BenchmarkResult {
            model_name: name.to_owned(),
            input_size: 640,
            input_source: "synthetic 640x640".to_owned(),
            state: RunState::Completed,
            start_time: Utc::now(),
            end_time: Utc::now(),
            elapsed_seconds: 10.0,
            total_frames: 100,
            fps: summary(fps),
            inference_ms: summary(inference_ms),
            system: SystemSummary {
                cpu_percent: summary(55.0),
                memory_percent: summary(40.0),
                temperature_celsius: temperature,
                throttle_events: 0,
                temperature_rise: temp.map(|_| 2.0),
            },
            system_samples: Vec::new(),
        }
    }

    fn fps_only() -> Vec<MetricSpec> {
        vec![MetricSpec {
            name: "fps".to_owned(),
            direction: MetricDirection::HigherIsBetter,
        }]
    }

    #[test]
    fn higher_fps_wins_with_twenty_percent_difference() {
        let a = result("model_a", 10.0, 100.0, Some(50.0));
        let b = result("model_b", 12.0, 83.3, Some(50.0));

        let report = compare(&a, &b, &fps_only()).expect("compare");
        let row = &report.metrics[0];
        assert_eq!(row.winner.as_deref(), Some("model_b"));
        assert!((row.percent_difference - 20.0).abs() < 1e-9);
    }

    #[test]
    fn lower_latency_wins() {
        let a = result("model_a", 25.0, 40.0, Some(50.0));
        let b = result("model_b", 20.0, 50.0, Some(50.0));
        let specs = vec![MetricSpec {
            name: "inference_ms".to_owned(),
            direction: MetricDirection::LowerIsBetter,
        }];

        let report = compare(&a, &b, &specs).expect("compare");
        let row = &report.metrics[0];
        assert_eq!(row.winner.as_deref(), Some("model_a"));
        // better 40 vs worse 50: |40 - 50| / 50 * 100 = 20%.
        assert!((row.percent_difference - 20.0).abs() < 1e-9);
    }

    #[test]
    fn exact_tie_has_no_winner() {
        let a = result("model_a", 15.0, 66.6, Some(50.0));
        let b = result("model_b", 15.0, 66.6, Some(50.0));

        let report = compare(&a, &b, &fps_only()).expect("compare");
        let row = &report.metrics[0];
        assert!(row.winner.is_none());
        assert_eq!(row.percent_difference, 0.0);
        assert!(report.overall_winner.is_none());
    }

    #[test]
    fn missing_metric_fails_explicitly() {
        let a = result("model_a", 10.0, 100.0, Some(50.0));
        let b = result("model_b", 12.0, 83.3, None);

        let err = compare(&a, &b, &default_metrics()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("model_b"), "names the record: {message}");
        assert!(
            message.contains("temperature_celsius"),
            "names the metric: {message}"
        );
    }

    #[test]
    fn unknown_metric_fails_explicitly() {
        let a = result("model_a", 10.0, 100.0, Some(50.0));
        let b = result("model_b", 12.0, 83.3, Some(50.0));
        let specs = vec![MetricSpec {
            name: "bogus".to_owned(),
            direction: MetricDirection::HigherIsBetter,
        }];

        let err = compare(&a, &b, &specs).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn rows_are_ranked_by_percent_difference() {
        // fps differs by 50%, latency by 20%.
        let a = result("model_a", 10.0, 40.0, Some(50.0));
        let b = result("model_b", 15.0, 50.0, Some(50.0));
        let specs = vec![
            MetricSpec {
                name: "inference_ms".to_owned(),
                direction: MetricDirection::LowerIsBetter,
            },
            MetricSpec {
                name: "fps".to_owned(),
                direction: MetricDirection::HigherIsBetter,
            },
        ];

        let report = compare(&a, &b, &specs).expect("compare");
        assert_eq!(report.metrics[0].metric, "fps");
        assert_eq!(report.metrics[1].metric, "inference_ms");
    }

    #[test]
    fn wins_tally_and_overall_winner() {
        // model_b wins fps; model_a wins latency; model_a wins cpu tie-free.
        let mut a = result("model_a", 10.0, 40.0, Some(50.0));
        let b = result("model_b", 12.0, 50.0, Some(50.0));
        a.system.cpu_percent = summary(30.0);

        let specs = vec![
            MetricSpec {
                name: "fps".to_owned(),
                direction: MetricDirection::HigherIsBetter,
            },
            MetricSpec {
                name: "inference_ms".to_owned(),
                direction: MetricDirection::LowerIsBetter,
            },
            MetricSpec {
                name: "cpu_percent".to_owned(),
                direction: MetricDirection::LowerIsBetter,
            },
        ];

        let report = compare(&a, &b, &specs).expect("compare");
        assert_eq!(report.wins["model_a"], 2);
        assert_eq!(report.wins["model_b"], 1);
        assert_eq!(report.overall_winner.as_deref(), Some("model_a"));
    }

    #[test]
    fn zero_worse_value_does_not_divide() {
        let a = result("model_a", 0.0, 100.0, Some(50.0));
        let b = result("model_b", 12.0, 83.3, Some(50.0));

        let report = compare(&a, &b, &fps_only()).expect("compare");
        let row = &report.metrics[0];
        assert_eq!(row.winner.as_deref(), Some("model_b"));
        assert_eq!(row.percent_difference, 0.0);
    }

    #[test]
    fn direction_serde_uses_short_names() {
        let json = serde_json::to_string(&MetricDirection::HigherIsBetter).expect("serialize");
        assert_eq!(json, "\"higher\"");
        let parsed: MetricDirection = serde_json::from_str("\"lower\"").expect("deserialize");
        assert_eq!(parsed, MetricDirection::LowerIsBetter);
    }
}
