//! Stage composition.
//!
//! Transform stages (crop, optimize, convert) never abort an ingestion. A
//! failed stage hands its own input to the next stage and the failure is kept
//! as a warning. `or_passthrough` is that rule as a plain function.

use mediaflow_core::ProcessingError;

/// What a transform stage hands to the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Applied(T),
    /// The stage failed; `output` is the stage's unchanged input.
    Degraded { output: T, error: ProcessingError },
}

impl<T> StageOutcome<T> {
    pub fn output(&self) -> &T {
        match self {
            StageOutcome::Applied(output) => output,
            StageOutcome::Degraded { output, .. } => output,
        }
    }

    pub fn into_output(self) -> T {
        match self {
            StageOutcome::Applied(output) => output,
            StageOutcome::Degraded { output, .. } => output,
        }
    }

    pub fn error(&self) -> Option<&ProcessingError> {
        match self {
            StageOutcome::Applied(_) => None,
            StageOutcome::Degraded { error, .. } => Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }
}

/// Keep the stage result on success, fall back to `input` on failure.
pub fn or_passthrough<T>(input: T, result: Result<T, ProcessingError>) -> StageOutcome<T> {
    match result {
        Ok(output) => StageOutcome::Applied(output),
        Err(error) => StageOutcome::Degraded {
            output: input,
            error,
        },
    }
}

/// Run CPU-bound stage work on the blocking pool.
pub async fn run_blocking<F, T>(work: F) -> Result<T, ProcessingError>
where
    F: FnOnce() -> Result<T, ProcessingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProcessingError::TaskFailed(e.to_string()))?
}
