//! Error types for the benchmark harness.

/// Top-level error type for the benchmarking harness.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Model loading or inference error.
    #[error("model error: {0}")]
    Model(String),

    /// Frame source acquisition or read error.
    #[error("source error: {0}")]
    Source(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Result record serialization or persistence error.
    #[error("report error: {0}")]
    Report(String),

    /// Comparison error (missing record or missing metric).
    #[error("comparison error: {0}")]
    Compare(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BenchError>;
