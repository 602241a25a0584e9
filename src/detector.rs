//! Model-execution seam for the benchmark loop.
//!
//! The runner times calls through the [`Detector`] trait; it never looks
//! inside the model. [`OrtDetector`] is the production implementation: a
//! thin ONNX Runtime adapter that feeds one preprocessed frame per call and
//! counts raw detection candidates above the confidence threshold. Full box
//! decoding and NMS belong to the application consuming detections, not to
//! a latency harness.

use crate::config::ModelConfig;
use crate::error::{BenchError, Result};
use crate::source::Frame;
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use std::collections::HashMap;
use tracing::info;

/// Output of one timed inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inference {
    /// Raw detection candidates scoring above the confidence threshold,
    /// before any non-maximum suppression.
    pub candidates: usize,
}

/// A model under benchmark.
pub trait Detector {
    /// Model identifier used for result records and file names.
    fn name(&self) -> &str;

    /// Run inference on one frame. The runner wall-clocks this call.
    fn infer(&mut self, frame: &Frame) -> Result<Inference>;

    /// Prime caches and JIT paths before timing starts.
    fn warmup(&mut self, _iterations: usize) -> Result<()> {
        Ok(())
    }
}

/// ONNX Runtime detector.
pub struct OrtDetector {
    session: Session,
    name: String,
    input_tensor: String,
    input_size: u32,
    confidence_threshold: f32,
}

impl std::fmt::Debug for OrtDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtDetector")
            .field("name", &self.name)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OrtDetector {
    /// Load the ONNX model described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Model`] naming the model path if the file is
    /// missing or the session cannot be built.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        if !config.path.is_file() {
            return Err(BenchError::Model(format!(
                "model file not found: {}",
                config.path.display()
            )));
        }

        info!("loading ONNX model: {}", config.path.display());
        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(config.intra_threads))
            .and_then(|b| b.commit_from_file(&config.path))
            .map_err(|e| {
                BenchError::Model(format!(
                    "failed to load ONNX model {}: {e}",
                    config.path.display()
                ))
            })?;

        let name = config.effective_name();
        info!(
            "model ready (name={name}, input={}x{}, threads={})",
            config.input_size, config.input_size, config.intra_threads
        );

        Ok(Self {
            session,
            name,
            input_tensor: config.input_tensor.clone(),
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
        })
    }
}

impl Detector for OrtDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self, frame: &Frame) -> Result<Inference> {
        let size = frame.size as usize;
        let expected = 3 * size * size;
        if frame.data.len() != expected {
            return Err(BenchError::Model(format!(
                "frame tensor has {} values, expected {expected}",
                frame.data.len()
            )));
        }

        let input = Tensor::from_array(([1_usize, 3, size, size], frame.data.clone()))
            .map_err(|e| BenchError::Model(format!("failed to create input tensor: {e}")))?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert(self.input_tensor.clone(), input.into());

        let outputs = self
            .session
            .run(SessionInputs::from(feed))
            .map_err(|e| BenchError::Model(format!("ONNX inference failed: {e}")))?;

        let output = &outputs[0_usize];
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| BenchError::Model(format!("failed to extract output tensor: {e}")))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let candidates = count_candidates(&dims, data, self.confidence_threshold);
        Ok(Inference { candidates })
    }

    fn warmup(&mut self, iterations: usize) -> Result<()> {
        info!("warming up {} ({iterations} iterations)", self.name);
        let frame = Frame::random(self.input_size);
        for _ in 0..iterations {
            self.infer(&frame)?;
        }
        Ok(())
    }
}

/// Count detection candidates whose best class score exceeds `conf`.
///
/// Detection heads lay out per-anchor attribute vectors as 4 box values
/// followed by per-class scores. Both common export layouts are handled:
/// `[1, attrs, anchors]` (attribute-major) and `[1, anchors, attrs]`
/// (anchor-major), distinguished by which axis is smaller. Unknown shapes
/// count zero candidates rather than failing the run.
fn count_candidates(dims: &[i64], data: &[f32], conf: f32) -> usize {
    let (rows, cols) = match dims {
        [1, a, b] if *a > 0 && *b > 0 => (*a as usize, *b as usize),
        [a, b] if *a > 0 && *b > 0 => (*a as usize, *b as usize),
        _ => return 0,
    };
    if data.len() != rows * cols {
        return 0;
    }

    if rows < cols {
        // [attrs, anchors]: attribute-major, one row per attribute.
        let (attrs, anchors) = (rows, cols);
        if attrs <= 4 {
            return 0;
        }
        (0..anchors)
            .filter(|&anchor| {
                (4..attrs).any(|attr| data[attr * anchors + anchor] > conf)
            })
            .count()
    } else {
        // [anchors, attrs]: anchor-major, one row per candidate.
        let (anchors, attrs) = (rows, cols);
        if attrs <= 4 {
            return 0;
        }
        data.chunks_exact(attrs)
            .take(anchors)
            .filter(|row| row[4..].iter().any(|&score| score > conf))
            .count()
    }
}
