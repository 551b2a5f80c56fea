//! Image processing module
//!
//! - Decode, probe and re-encode (processor)
//! - Fixed-aspect cropping (crop)
//! - Bounding-box downscaling (resize)

pub mod crop;
pub mod processor;
pub mod resize;

pub use crop::{resolve_crop, Cropper};
pub use processor::{ImageProcessor, WEBP_MAX_DIMENSION};
pub use resize::{fit_within, select_filter, Optimizer};
