//! Hooks for reporting ingestion progress
//!
//! The pipeline itself never touches a UI or a log sink directly. It reports
//! stage transitions and degradations to an `IngestObserver`, and the host
//! decides what to do with them.

use crate::error::{ErrorMetadata, ProcessingError, UploadError};
use crate::models::IngestStage;

/// Receives progress events for one ingestion.
///
/// Implementations must be cheap; they are called inline on the ingestion task.
pub trait IngestObserver: Send + Sync {
    /// A new stage started (or a terminal stage was reached)
    fn stage_changed(&self, file_name: &str, stage: IngestStage);

    /// A stage failed recoverably and its input was passed through
    fn stage_degraded(&self, file_name: &str, stage: IngestStage, error: &ProcessingError);

    /// The transformed upload failed and the original file is being retried
    fn fallback_started(&self, file_name: &str, primary: &UploadError);
}

/// No-op implementation for headless callers and tests
pub struct NoopObserver;

impl IngestObserver for NoopObserver {
    fn stage_changed(&self, _file_name: &str, _stage: IngestStage) {}

    fn stage_degraded(&self, _file_name: &str, _stage: IngestStage, _error: &ProcessingError) {}

    fn fallback_started(&self, _file_name: &str, _primary: &UploadError) {}
}

/// Emits every event as a `tracing` record.
pub struct TracingObserver;

impl IngestObserver for TracingObserver {
    fn stage_changed(&self, file_name: &str, stage: IngestStage) {
        tracing::debug!(file_name = %file_name, stage = %stage, "Ingestion stage changed");
    }

    fn stage_degraded(&self, file_name: &str, stage: IngestStage, error: &ProcessingError) {
        tracing::warn!(
            file_name = %file_name,
            stage = %stage,
            error_code = error.error_code(),
            error = %error,
            "Stage failed, continuing with its input"
        );
    }

    fn fallback_started(&self, file_name: &str, primary: &UploadError) {
        tracing::warn!(
            file_name = %file_name,
            error_code = primary.error_code(),
            error = %primary,
            "Optimized upload failed, retrying with original file"
        );
    }
}
