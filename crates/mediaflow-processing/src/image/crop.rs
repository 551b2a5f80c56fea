use mediaflow_core::{
    CropRequest, CropSpec, ImageDimensions, ProcessedBuffer, ProcessingError, Quality,
};

use super::processor::ImageProcessor;

/// Cuts a fixed-aspect rectangle out of an image.
#[derive(Debug, Clone, Copy)]
pub struct Cropper {
    quality: Quality,
}

impl Cropper {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }

    /// Crop `buffer` to exactly `spec.width` x `spec.height`, re-encoded in
    /// the buffer's own format.
    pub fn crop(
        &self,
        buffer: &ProcessedBuffer,
        spec: &CropSpec,
    ) -> Result<ProcessedBuffer, ProcessingError> {
        let img = ImageProcessor::decode(&buffer.data)?;
        check_bounds(spec, ImageDimensions::new(img.width(), img.height()))?;

        let cropped = img.crop_imm(spec.x, spec.y, spec.width, spec.height);
        ImageProcessor::encode(&cropped, buffer.format, self.quality)
    }
}

/// Concrete rectangle for a crop request, once image dimensions are known.
///
/// `None` means no cropping.
pub fn resolve_crop(request: &CropRequest, dims: ImageDimensions) -> Option<CropSpec> {
    match request {
        CropRequest::None => None,
        CropRequest::Explicit(spec) => Some(*spec),
        CropRequest::Centered(aspect) => CropSpec::centered(dims.width, dims.height, *aspect),
    }
}

fn check_bounds(spec: &CropSpec, dims: ImageDimensions) -> Result<(), ProcessingError> {
    if spec.width == 0 || spec.height == 0 {
        return Err(ProcessingError::InvalidCrop(format!(
            "empty rectangle {}x{}",
            spec.width, spec.height
        )));
    }

    let right = spec.x.checked_add(spec.width);
    let bottom = spec.y.checked_add(spec.height);
    let inside = matches!((right, bottom), (Some(r), Some(b)) if r <= dims.width && b <= dims.height);
    if !inside {
        return Err(ProcessingError::InvalidCrop(format!(
            "rectangle {}x{} at ({}, {}) exceeds image {}x{}",
            spec.width, spec.height, spec.x, spec.y, dims.width, dims.height
        )));
    }

    if !spec.matches_aspect() {
        return Err(ProcessingError::InvalidCrop(format!(
            "rectangle {}x{} does not match aspect {}",
            spec.width, spec.height, spec.aspect
        )));
    }

    Ok(())
}
