//! Mediaflow Core Library
//!
//! This crate provides the domain models, error types, configuration and pure
//! helpers (share-link normalization, library search) shared by every
//! mediaflow component.

pub mod config;
pub mod error;
pub mod hooks;
pub mod library;
pub mod models;
pub mod share_url;

// Re-export commonly used types
pub use config::{PipelineConfig, RemoteStorageConfig, UploadFallback};
pub use error::{
    ConfigError, ErrorMetadata, IngestError, LoadError, LogLevel, ProcessingError, UploadError,
    ValidationError,
};
pub use hooks::{IngestObserver, NoopObserver, TracingObserver};
pub use library::search;
pub use models::{
    normalize_mime, AspectRatio, Asset, BatchResult, BatchStatus, CompressionStats, CropRequest,
    CropSpec, ImageDimensions, IngestOptions, IngestProfile, IngestReport, IngestStage,
    MediaFormat, ProcessedBuffer, Quality, RawFile, RawInput, ResolvedImage, UploadDestination,
    ValidationPolicy,
};
pub use share_url::{normalize, share_provider, ShareProvider};
