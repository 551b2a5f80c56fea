use image::imageops::FilterType;
use mediaflow_core::{ProcessedBuffer, ProcessingError, Quality};

use super::processor::ImageProcessor;

/// Target size for fitting `width` x `height` inside `max_width` x `max_height`.
///
/// Returns `None` when the image already fits (never upscales). Otherwise
/// both sides are scaled by `min(max_width / width, max_height / height)`
/// and rounded, clamped to `1..=max`.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);

    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return None;
    }

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    Some((new_width, new_height))
}

/// Select appropriate filter type based on resize ratio
pub fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width.max(1) as f32;
    let height_ratio = orig_height as f32 / new_height.max(1) as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

/// Downsamples images into a bounding box, keeping aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    quality: Quality,
}

impl Optimizer {
    /// `quality` applies when the buffer's own format is lossy.
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    /// Fit `buffer` into `max_width` x `max_height`.
    ///
    /// A buffer that already fits is returned as is, without re-encoding.
    pub fn optimize(
        &self,
        buffer: &ProcessedBuffer,
        max_width: u32,
        max_height: u32,
    ) -> Result<ProcessedBuffer, ProcessingError> {
        let (width, height) = if buffer.width == 0 || buffer.height == 0 {
            let dims = ImageProcessor::probe_dimensions(&buffer.data)?;
            (dims.width, dims.height)
        } else {
            (buffer.width, buffer.height)
        };

        let Some((new_width, new_height)) = fit_within(width, height, max_width, max_height) else {
            return Ok(buffer.clone());
        };

        let img = ImageProcessor::decode(&buffer.data)?;
        let filter = select_filter(width, height, new_width, new_height);
        let resized = img.resize_exact(new_width, new_height, filter);

        tracing::debug!(
            from_width = width,
            from_height = height,
            to_width = new_width,
            to_height = new_height,
            filter = ?filter,
            "Downscaled image"
        );

        ImageProcessor::encode(&resized, buffer.format, self.quality)
    }
}
