//! Batch ingestion for the media library.

use futures::stream::{self, StreamExt};
use mediaflow_core::{
    BatchResult, ErrorMetadata, IngestOptions, RawFile, UploadDestination, ValidationPolicy,
};

use super::pipeline::IngestPipeline;

impl IngestPipeline {
    /// Ingest `files` with the configured default options.
    pub async fn ingest_batch(
        &self,
        files: Vec<RawFile>,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
    ) -> Vec<BatchResult> {
        let options = self.config().default_options();
        self.ingest_batch_with(files, policy, destination, options)
            .await
    }

    /// Ingest `files` concurrently, at most `batch_concurrency` at a time.
    ///
    /// Always returns one entry per input, in input order. A failing file is
    /// recorded in its entry and never affects the others.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub async fn ingest_batch_with(
        &self,
        files: Vec<RawFile>,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
        options: IngestOptions,
    ) -> Vec<BatchResult> {
        let concurrency = self.config().concurrency();

        let mut results: Vec<(usize, BatchResult)> = stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| async move {
                let file_name = file.file_name.clone();
                let outcome = self
                    .ingest_file_with(file, policy, destination, options)
                    .await;
                let result = match outcome {
                    Ok(report) => BatchResult::success(file_name, report.asset),
                    Err(e) => {
                        tracing::warn!(
                            file_name = %file_name,
                            error_code = e.error_code(),
                            error = %e,
                            "Batch item failed"
                        );
                        BatchResult::failure(file_name, e.error_code(), e.to_string())
                    }
                };
                (index, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let failed = results.iter().filter(|(_, r)| !r.is_success()).count();
        tracing::info!(
            total = results.len(),
            failed,
            concurrency,
            "Batch ingestion finished"
        );

        results.into_iter().map(|(_, result)| result).collect()
    }
}
