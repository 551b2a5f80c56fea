//! Ingestion pipeline: validate → [crop] → optimize → convert → upload.
//!
//! Validation failures stop the ingestion before any bytes leave the process.
//! Transform stages degrade (their input is passed on and a warning is kept).
//! Upload failures are fatal unless the retry with the original file succeeds.

use std::sync::Arc;

use mediaflow_core::{
    Asset, CompressionStats, IngestError, IngestObserver, IngestOptions, IngestReport,
    IngestStage, PipelineConfig, ProcessedBuffer, RawFile, RawInput, ResolvedImage,
    TracingObserver, UploadDestination, UploadFallback, ValidationPolicy,
};
use mediaflow_storage::{RemoteUploader, UploadFile};
use tokio_util::sync::CancellationToken;

use super::stages::{or_passthrough, run_blocking, StageOutcome};
use crate::compression::{Conversion, FormatConverter};
use crate::image::{resolve_crop, Cropper, ImageProcessor, Optimizer};
use crate::source_url::{self, ImageProbe};
use crate::validator::MediaValidator;

/// Result of [`IngestPipeline::ingest`].
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A file was transformed and stored.
    Uploaded(IngestReport),
    /// A URL was normalized and verified; nothing was stored.
    Linked(ResolvedImage),
}

/// Orchestrates one ingestion at a time; cheap to clone and share.
#[derive(Clone)]
pub struct IngestPipeline {
    config: Arc<PipelineConfig>,
    uploader: Arc<dyn RemoteUploader>,
    probe: Arc<dyn ImageProbe>,
    observer: Arc<dyn IngestObserver>,
}

impl IngestPipeline {
    pub fn new(
        config: PipelineConfig,
        uploader: Arc<dyn RemoteUploader>,
        probe: Arc<dyn ImageProbe>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            uploader,
            probe,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IngestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest either kind of input with the configured default options.
    pub async fn ingest(
        &self,
        input: RawInput,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
    ) -> Result<IngestOutcome, IngestError> {
        match input {
            RawInput::File(file) => {
                let options = self.config.default_options();
                self.ingest_file_with(file, policy, destination, options)
                    .await
                    .map(IngestOutcome::Uploaded)
            }
            RawInput::Url(url) => self.ingest_url(&url).await.map(IngestOutcome::Linked),
        }
    }

    /// Ingest one file with the configured default options.
    pub async fn ingest_file(
        &self,
        file: RawFile,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
    ) -> Result<Asset, IngestError> {
        let options = self.config.default_options();
        let report = self
            .ingest_file_with(file, policy, destination, options)
            .await?;
        Ok(report.asset)
    }

    /// Ingest one file and report what every stage did.
    #[tracing::instrument(
        skip(self, file, policy, destination, options),
        fields(file_name = %file.file_name, size_bytes = file.data.len())
    )]
    pub async fn ingest_file_with(
        &self,
        file: RawFile,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
        options: IngestOptions,
    ) -> Result<IngestReport, IngestError> {
        let file_name = file.file_name.clone();
        let result = self.run(file, policy, destination, options).await;
        self.finish(&file_name, &result);
        result
    }

    /// Like [`ingest_file_with`](Self::ingest_file_with), abandoned as soon as
    /// `cancel` fires. A cancelled ingestion never yields an asset.
    pub async fn ingest_file_cancellable(
        &self,
        file: RawFile,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
        options: IngestOptions,
        cancel: CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let file_name = file.file_name.clone();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
            result = self.run(file, policy, destination, options) => result,
        };
        self.finish(&file_name, &result);
        result
    }

    /// Normalize a share link and confirm it loads as an image.
    #[tracing::instrument(skip(self))]
    pub async fn ingest_url(&self, url: &str) -> Result<ResolvedImage, IngestError> {
        let resolved = source_url::resolve(self.probe.as_ref(), url)
            .await
            .map_err(|e| {
                tracing::info!(error = %e, "Image URL could not be resolved");
                e
            })?;

        tracing::info!(
            secure_url = %resolved.secure_url,
            width = resolved.width,
            height = resolved.height,
            "Image URL resolved"
        );
        Ok(resolved)
    }

    fn finish<T>(&self, file_name: &str, result: &Result<T, IngestError>) {
        let stage = if result.is_ok() {
            IngestStage::Done
        } else {
            IngestStage::Failed
        };
        self.observer.stage_changed(file_name, stage);
    }

    async fn run(
        &self,
        file: RawFile,
        policy: &ValidationPolicy,
        destination: &UploadDestination,
        options: IngestOptions,
    ) -> Result<IngestReport, IngestError> {
        let file_name = file.file_name.clone();
        let original_bytes = file.byte_len();
        let mut warnings = Vec::new();

        self.observer.stage_changed(&file_name, IngestStage::Validating);
        MediaValidator::new(policy).validate_file(&file)?;

        let data = file.data.clone();
        let content_type = file.content_type.clone();
        let loaded =
            tokio::task::spawn_blocking(move || ImageProcessor::load(data, &content_type))
                .await
                .map_err(|e| IngestError::Internal(format!("image probe task failed: {}", e)))?;

        let (upload, compression) = match loaded {
            Ok(original) => {
                let (buffer, compression) = self
                    .transform(&file_name, original, options, &mut warnings)
                    .await;
                let upload = UploadFile::new(
                    upload_file_name(&file_name, buffer.format.extension()),
                    buffer.content_type(),
                    buffer.data,
                );
                (upload, compression)
            }
            Err(error) => {
                // Not decodable here; the remote side may still accept it.
                self.observer
                    .stage_degraded(&file_name, IngestStage::Optimizing, &error);
                warnings.push(format!("{}: {}", IngestStage::Optimizing, error));
                let upload = UploadFile::new(
                    file.file_name.clone(),
                    file.content_type.clone(),
                    file.data.clone(),
                );
                (upload, None)
            }
        };

        self.observer.stage_changed(&file_name, IngestStage::Uploading);
        let uploaded_bytes = upload.byte_len();
        let transformed = upload.data != file.data;

        let retry_original =
            transformed && self.config.upload_fallback == UploadFallback::RetryWithOriginal;

        let primary_result = self.uploader.upload(upload, destination).await;
        let (asset, used_fallback, sent_bytes) = match primary_result {
            Ok(asset) => (asset, false, uploaded_bytes),
            Err(primary) if retry_original => {
                self.observer.fallback_started(&file_name, &primary);
                let original = UploadFile::new(
                    file.file_name.clone(),
                    file.content_type.clone(),
                    file.data.clone(),
                );
                match self.uploader.upload(original, destination).await {
                    Ok(asset) => {
                        warnings.push(format!("{}: {}", IngestStage::Uploading, primary));
                        (asset, true, original_bytes)
                    }
                    Err(fallback) => {
                        tracing::warn!(
                            file_name = %file_name,
                            primary_error = %primary,
                            fallback_error = %fallback,
                            "Upload failed with and without optimization"
                        );
                        return Err(fallback.into());
                    }
                }
            }
            Err(primary) => return Err(primary.into()),
        };

        let end_to_end = CompressionStats::compute(original_bytes, sent_bytes);

        tracing::info!(
            public_id = %asset.public_id,
            width = asset.width,
            height = asset.height,
            original_bytes,
            uploaded_bytes = sent_bytes,
            ratio_percent = end_to_end.ratio_percent,
            used_fallback,
            warnings = warnings.len(),
            "Image ingested"
        );

        Ok(IngestReport {
            asset,
            original_bytes,
            compression,
            end_to_end,
            warnings,
            used_fallback,
        })
    }

    /// Crop, optimize and convert. Never fails; degraded stages add warnings.
    async fn transform(
        &self,
        file_name: &str,
        original: ProcessedBuffer,
        options: IngestOptions,
        warnings: &mut Vec<String>,
    ) -> (ProcessedBuffer, Option<CompressionStats>) {
        let mut current = original;

        if let Some(spec) = resolve_crop(&options.crop, current.dimensions()) {
            self.observer.stage_changed(file_name, IngestStage::Cropping);
            let input = current.clone();
            let cropper = Cropper::new(options.quality);
            let result = run_blocking(move || cropper.crop(&input, &spec)).await;
            let outcome = or_passthrough(current, result);
            current = self.record(file_name, IngestStage::Cropping, outcome, warnings);
        }

        self.observer.stage_changed(file_name, IngestStage::Optimizing);
        let input = current.clone();
        let optimizer = Optimizer::new(options.quality);
        let (max_width, max_height) = (options.max_width, options.max_height);
        let result =
            run_blocking(move || optimizer.optimize(&input, max_width, max_height)).await;
        let outcome = or_passthrough(current, result);
        current = self.record(file_name, IngestStage::Optimizing, outcome, warnings);

        self.observer.stage_changed(file_name, IngestStage::Converting);
        let input = current.clone();
        let quality = options.quality;
        let result = run_blocking(move || FormatConverter::convert(&input, quality)).await;
        let conversion = self.record(
            file_name,
            IngestStage::Converting,
            or_passthrough(Conversion::unchanged(current), result),
            warnings,
        );

        (conversion.buffer, conversion.stats)
    }

    fn record<T>(
        &self,
        file_name: &str,
        stage: IngestStage,
        outcome: StageOutcome<T>,
        warnings: &mut Vec<String>,
    ) -> T {
        if let Some(error) = outcome.error() {
            self.observer.stage_degraded(file_name, stage, error);
            warnings.push(format!("{}: {}", stage, error));
        }
        outcome.into_output()
    }
}

/// `photo.jpg` uploaded as WebP becomes `photo.webp`.
fn upload_file_name(original: &str, extension: &str) -> String {
    match original.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.{}", stem, extension),
        _ => format!("{}.{}", original, extension),
    }
}
