//! Configuration types for the benchmark harness.

use crate::compare::{MetricDirection, default_metrics};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for a benchmark invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Model-under-test settings.
    pub model: ModelConfig,
    /// Run loop settings.
    pub run: RunSettings,
    /// Output locations.
    pub output: OutputConfig,
    /// Comparison settings.
    pub compare: CompareConfig,
}

/// Model-under-test configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: PathBuf,
    /// Model identifier used for result records (None = file stem).
    pub name: Option<String>,
    /// Square input resolution fed to the model.
    pub input_size: u32,
    /// Confidence threshold for counting detection candidates.
    pub confidence_threshold: f32,
    /// ONNX Runtime intra-op thread count. Pi 4B has 4 cores.
    pub intra_threads: usize,
    /// Name of the model's input tensor.
    pub input_tensor: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            name: None,
            input_size: 640,
            confidence_threshold: 0.25,
            intra_threads: 4,
            input_tensor: "images".to_owned(),
        }
    }
}

impl ModelConfig {
    /// The configured name, or the model file stem, or `"model"`.
    pub fn effective_name(&self) -> String {
        if let Some(ref name) = self.name
            && !name.is_empty()
        {
            return name.clone();
        }
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_owned())
    }
}

/// Run loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Duration-mode run length in seconds.
    pub duration_seconds: u64,
    /// Iteration-mode frame count.
    pub iterations: u64,
    /// Untimed warm-up inferences before measurement starts.
    pub warmup_iterations: usize,
    /// System sampling cadence in milliseconds.
    pub sample_interval_ms: u64,
    /// Emit a progress log line every N frames.
    pub log_every_frames: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            duration_seconds: 60,
            iterations: 100,
            warmup_iterations: 10,
            sample_interval_ms: 1_000,
            log_every_frames: 30,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Results root directory (None = platform default, see [`crate::bench_dirs`]).
    pub results_dir: Option<PathBuf>,
}

impl OutputConfig {
    /// The configured results directory, or the platform default.
    pub fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(crate::bench_dirs::results_dir)
    }
}

/// Comparison configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Model identifiers resolved in `--auto` mode (latest record each).
    pub models: Vec<String>,
    /// Metrics to compare, with an explicit better-direction per metric.
    pub metrics: Vec<MetricSpec>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            models: vec!["yolov8n".to_owned(), "yolo11n".to_owned()],
            metrics: default_metrics(),
        }
    }
}

/// One compared metric and which direction wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Metric key, e.g. `fps` or `inference_ms`.
    pub name: String,
    /// Which side of the comparison is better.
    pub direction: MetricDirection,
}

impl BenchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::BenchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot
    /// be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::BenchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = BenchConfig::default();
        assert_eq!(config.model.input_size, 640);
        assert!((config.model.confidence_threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.run.duration_seconds, 60);
        assert_eq!(config.run.iterations, 100);
        assert_eq!(config.run.sample_interval_ms, 1_000);
        assert_eq!(config.compare.models.len(), 2);
        assert!(!config.compare.metrics.is_empty());
    }

    #[test]
    fn empty_toml_deserializes_to_defaults() {
        let config: BenchConfig = toml::from_str("").expect("deserialize empty TOML");
        assert_eq!(config.model.input_size, 640);
        assert_eq!(config.run.warmup_iterations, 10);
    }

    #[test]
    fn toml_roundtrip_preserves_settings() {
        let mut config = BenchConfig::default();
        config.model.path = PathBuf::from("models/yolov8n.onnx");
        config.model.name = Some("yolov8n".to_owned());
        config.run.iterations = 250;
        config.output.results_dir = Some(PathBuf::from("/tmp/results"));

        let toml_str = toml::to_string(&config).expect("serialize to TOML");
        let restored: BenchConfig = toml::from_str(&toml_str).expect("deserialize from TOML");

        assert_eq!(restored.model.path, config.model.path);
        assert_eq!(restored.model.name, config.model.name);
        assert_eq!(restored.run.iterations, 250);
        assert_eq!(restored.output.results_dir, config.output.results_dir);
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("edgebench.toml");

        let mut config = BenchConfig::default();
        config.run.duration_seconds = 15;
        config.save_to_file(&path).expect("save");

        let loaded = BenchConfig::from_file(&path).expect("load");
        assert_eq!(loaded.run.duration_seconds, 15);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = BenchConfig::from_file(std::path::Path::new("/nonexistent/edgebench.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "run = \"not a table\"").expect("write");
        assert!(BenchConfig::from_file(&path).is_err());
    }

    #[test]
    fn effective_name_prefers_configured_name() {
        let model = ModelConfig {
            path: PathBuf::from("models/yolov8n.onnx"),
            name: Some("custom".to_owned()),
            ..Default::default()
        };
        assert_eq!(model.effective_name(), "custom");
    }

    #[test]
    fn effective_name_falls_back_to_file_stem() {
        let model = ModelConfig {
            path: PathBuf::from("models/yolo11n.onnx"),
            ..Default::default()
        };
        assert_eq!(model.effective_name(), "yolo11n");
    }
}
