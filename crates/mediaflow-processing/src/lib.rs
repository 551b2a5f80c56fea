//! Mediaflow Processing Library
//!
//! Validation, image transformation (crop, downscale, WebP conversion),
//! share-link resolution and the upload orchestrator that ties them together.

pub mod compression;
pub mod image;
pub mod source_url;
pub mod upload;
pub mod validator;

// Re-export commonly used types
pub use compression::{Conversion, FormatConverter};
pub use self::image::{
    fit_within, resolve_crop, select_filter, Cropper, ImageProcessor, Optimizer,
};
pub use source_url::{resolve, HttpImageProbe, ImageProbe};
pub use upload::{or_passthrough, IngestOutcome, IngestPipeline, StageOutcome};
pub use validator::{content_type_for_extension, validate, MediaValidator};
