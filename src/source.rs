//! Frame sources for benchmark runs.
//!
//! A [`FrameSource`] yields preprocessed input frames for the model under
//! test. The harness ships two: [`ImageSource`] decodes a static image once
//! and re-feeds it each iteration, and [`SyntheticSource`] generates random
//! tensor frames when no test asset is at hand. Live camera capture is an
//! external concern; a camera-backed implementation plugs in through the
//! same trait without harness changes.

use crate::error::{BenchError, Result};
use image::imageops::FilterType;
use rand::Rng;
use std::path::{Path, PathBuf};

/// A preprocessed model input: NCHW `f32` tensor data (batch of one),
/// RGB channels normalized to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Tensor data, length `3 * size * size`.
    pub data: Vec<f32>,
    /// Square side length in pixels.
    pub size: u32,
}

impl Frame {
    /// Random frame of the given side length (warm-up / synthetic input).
    pub fn random(size: u32) -> Self {
        let mut rng = rand::thread_rng();
        let len = 3 * (size as usize) * (size as usize);
        let data = (0..len).map(|_| rng.r#gen::<f32>()).collect();
        Self { data, size }
    }
}

/// Supplier of benchmark input frames.
pub trait FrameSource {
    /// Human-readable description for logs and the result header.
    fn describe(&self) -> String;

    /// Produce the next frame.
    ///
    /// `Ok(None)` means the source is exhausted (end of stream); an error
    /// means the source became unavailable. The runner treats either as a
    /// mid-run interruption once at least one frame has been processed.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Static image source: decodes and preprocesses once, then re-feeds the
/// same frame each iteration.
#[derive(Debug)]
pub struct ImageSource {
    frame: Frame,
    path: PathBuf,
}

impl ImageSource {
    /// Decode `path` and preprocess it to a square `input_size` frame.
    ///
    /// # Errors
    ///
    /// Returns [`BenchError::Source`] naming the path if the image cannot
    /// be read or decoded.
    pub fn open(path: &Path, input_size: u32) -> Result<Self> {
        let image = image::open(path).map_err(|e| {
            BenchError::Source(format!("failed to load image {}: {e}", path.display()))
        })?;
        let frame = preprocess(&image, input_size);
        Ok(Self {
            frame,
            path: path.to_path_buf(),
        })
    }
}

impl FrameSource for ImageSource {
    fn describe(&self) -> String {
        format!("image {}", self.path.display())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(Some(self.frame.clone()))
    }
}

/// Synthetic source: a fresh random frame per call, never exhausted.
pub struct SyntheticSource {
    size: u32,
}

impl SyntheticSource {
    pub fn new(input_size: u32) -> Self {
        Self { size: input_size }
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.size, self.size)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(Some(Frame::random(self.size)))
    }
}

/// Resize to `size`×`size`, convert to RGB, normalize to `[0, 1]`, and
/// reorder HWC → CHW.
fn preprocess(image: &image::DynamicImage, size: u32) -> Frame {
    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let pixels = rgb.as_raw();

    let plane = (size as usize) * (size as usize);
    let mut data = vec![0.0_f32; 3 * plane];
    for (i, px) in pixels.chunks_exact(3).enumerate() {
        data[i] = px[0] as f32 / 255.0;
        data[plane + i] = px[1] as f32 / 255.0;
        data[2 * plane + i] = px[2] as f32 / 255.0;
    }

    Frame { data, size }
}
