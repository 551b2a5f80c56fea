pub mod asset;
pub mod batch;
pub mod ingest;
pub mod media;

pub use asset::{Asset, CompressionStats, ResolvedImage};
pub use batch::{BatchResult, BatchStatus};
pub use ingest::{
    AspectRatio, CropRequest, CropSpec, IngestOptions, IngestProfile, IngestReport, IngestStage,
    RawFile, RawInput, UploadDestination, ValidationPolicy,
};
pub use media::{normalize_mime, ImageDimensions, MediaFormat, ProcessedBuffer, Quality};
