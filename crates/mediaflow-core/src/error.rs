//! Error types module
//!
//! One `thiserror` enum per concern. Stage-local failures (`ProcessingError`)
//! are recovered by the pipeline; `ValidationError`, `UploadError` and
//! `LoadError` are fatal for an ingestion and surface through `IngestError`.
//! Every error describes itself through [`ErrorMetadata`].

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected failures such as rejected input
    Debug,
    /// Recoverable or remote-side issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Self-description of an error for callers and logs.
pub trait ErrorMetadata {
    /// Machine-readable kind (e.g. "too-large")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same call may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the caller
    fn suggested_action(&self) -> Option<&'static str>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported format: {content_type} (allowed: {})", .allowed.join(", "))]
    UnsupportedFormat {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Content does not match declared type: declared {declared}, detected {detected}")]
    ContentMismatch { declared: String, detected: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Image {width}x{height} exceeds the {max}px limit of the target format")]
    TooLargeForFormat { width: u32, height: u32, max: u32 },

    #[error("Processing task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage unreachable: {0}")]
    Unreachable(String),

    #[error("Upload timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),

    #[error("Uploader misconfigured: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("Image unreachable: {0}")]
    Unreachable(String),

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Image load timed out after {0}s")]
    Timeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Quality must be in (0, 1], got {0}")]
    InvalidQuality(f32),
}

/// Static metadata: (error_code, recoverable, suggested_action, log_level).
type StaticMetadata = (&'static str, bool, Option<&'static str>, LogLevel);

fn validation_metadata(err: &ValidationError) -> StaticMetadata {
    match err {
        ValidationError::UnsupportedFormat { .. } => (
            "unsupported-format",
            false,
            Some("Convert the file to an allowed image format"),
            LogLevel::Debug,
        ),
        ValidationError::TooLarge { .. } => (
            "too-large",
            false,
            Some("Reduce file size and try again"),
            LogLevel::Debug,
        ),
        ValidationError::EmptyFile => (
            "empty-file",
            false,
            Some("Select a non-empty file"),
            LogLevel::Debug,
        ),
        ValidationError::ContentMismatch { .. } => (
            "content-mismatch",
            false,
            Some("Check that the file extension matches its contents"),
            LogLevel::Debug,
        ),
    }
}

fn processing_metadata(err: &ProcessingError) -> StaticMetadata {
    match err {
        ProcessingError::Decode(_) => (
            "decode-failed",
            false,
            Some("Check image format and try a different file"),
            LogLevel::Warn,
        ),
        ProcessingError::Encode(_) => ("encode-failed", false, None, LogLevel::Warn),
        ProcessingError::InvalidCrop(_) => (
            "invalid-crop",
            false,
            Some("Select a crop area inside the image"),
            LogLevel::Debug,
        ),
        ProcessingError::TooLargeForFormat { .. } => (
            "too-large-for-format",
            false,
            Some("Reduce image dimensions"),
            LogLevel::Warn,
        ),
        ProcessingError::TaskFailed(_) => ("task-failed", true, None, LogLevel::Error),
    }
}

const USE_URL_INSTEAD: &str = "Retry later or paste a public image URL instead";

fn upload_metadata(err: &UploadError) -> StaticMetadata {
    match err {
        UploadError::Rejected { status, .. } => (
            "upload-rejected",
            *status >= 500 || *status == 429,
            Some(USE_URL_INSTEAD),
            LogLevel::Warn,
        ),
        UploadError::Unreachable(_) => (
            "upload-unreachable",
            true,
            Some(USE_URL_INSTEAD),
            LogLevel::Warn,
        ),
        UploadError::Timeout(_) => (
            "upload-timeout",
            true,
            Some(USE_URL_INSTEAD),
            LogLevel::Warn,
        ),
        UploadError::InvalidResponse(_) => (
            "upload-invalid-response",
            false,
            Some(USE_URL_INSTEAD),
            LogLevel::Error,
        ),
        UploadError::Configuration(_) => (
            "upload-misconfigured",
            false,
            Some("Check the upload endpoint configuration"),
            LogLevel::Error,
        ),
    }
}

fn load_metadata(err: &LoadError) -> StaticMetadata {
    let recoverable = matches!(err, LoadError::Unreachable(_) | LoadError::Timeout(_));
    (
        "unreachable-or-not-an-image",
        recoverable,
        Some("Check that the URL is public and points directly to an image"),
        LogLevel::Debug,
    )
}

fn ingest_metadata(err: &IngestError) -> StaticMetadata {
    match err {
        IngestError::Validation(e) => validation_metadata(e),
        IngestError::Upload(e) => upload_metadata(e),
        IngestError::Load(e) => load_metadata(e),
        IngestError::Cancelled => ("cancelled", true, None, LogLevel::Debug),
        IngestError::Internal(_) => (
            "internal",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

macro_rules! impl_error_metadata {
    ($ty:ty, $table:ident) => {
        impl ErrorMetadata for $ty {
            fn error_code(&self) -> &'static str {
                $table(self).0
            }

            fn is_recoverable(&self) -> bool {
                $table(self).1
            }

            fn suggested_action(&self) -> Option<&'static str> {
                $table(self).2
            }

            fn log_level(&self) -> LogLevel {
                $table(self).3
            }
        }
    };
}

impl_error_metadata!(ValidationError, validation_metadata);
impl_error_metadata!(ProcessingError, processing_metadata);
impl_error_metadata!(UploadError, upload_metadata);
impl_error_metadata!(LoadError, load_metadata);
impl_error_metadata!(IngestError, ingest_metadata);
