//! Centralized filesystem paths for edgebench.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//! Both paths can be overridden for tests or custom deployments:
//! - `EDGEBENCH_DATA_DIR` — overrides [`data_dir`]
//! - `EDGEBENCH_RESULTS_DIR` — overrides [`results_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/edgebench/` by default. Override with the
/// `EDGEBENCH_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EDGEBENCH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("edgebench"))
        .unwrap_or_else(|| PathBuf::from("/tmp/edgebench-data"))
}

/// Benchmark results root (`data_dir()/results/`).
///
/// Each run writes into `<results_dir>/<model_name>/`. Override with the
/// `EDGEBENCH_RESULTS_DIR` environment variable.
#[must_use]
pub fn results_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EDGEBENCH_RESULTS_DIR") {
        return PathBuf::from(override_dir);
    }
    data_dir().join("results")
}
