//! Upload orchestration: the per-file state machine, batch mode and the
//! stage-degradation combinator.

pub mod batch;
pub mod pipeline;
pub mod stages;

pub use pipeline::{IngestOutcome, IngestPipeline};
pub use stages::{or_passthrough, run_blocking, StageOutcome};
