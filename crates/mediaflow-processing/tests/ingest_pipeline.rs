use async_trait::async_trait;
use chrono::Utc;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use mediaflow_core::{
    AspectRatio, Asset, BatchStatus, CropRequest, CropSpec, ErrorMetadata, ImageDimensions,
    IngestError, IngestObserver, IngestOptions, IngestProfile, IngestStage, LoadError,
    NoopObserver, PipelineConfig, ProcessingError, Quality, RawFile, RawInput,
    UploadDestination, UploadError, UploadFallback, ValidationError, ValidationPolicy,
};
use mediaflow_processing::{ImageProbe, ImageProcessor, IngestOutcome, IngestPipeline};
use mediaflow_storage::{RemoteUploader, UploadFile};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stores uploads in memory and reports the dimensions of what it received.
#[derive(Default)]
struct MockUploader {
    calls: Mutex<Vec<UploadFile>>,
    failures: Mutex<VecDeque<UploadError>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockUploader {
    fn failing_with(errors: Vec<UploadError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            ..Default::default()
        }
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<UploadFile> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteUploader for MockUploader {
    async fn upload(
        &self,
        file: UploadFile,
        destination: &UploadDestination,
    ) -> Result<Asset, UploadError> {
        self.calls.lock().unwrap().push(file.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let (width, height) = ImageReader::new(Cursor::new(&file.data))
            .with_guessed_format()
            .ok()
            .and_then(|r| r.into_dimensions().ok())
            .unwrap_or((0, 0));

        Ok(Asset {
            public_id: format!("{}/{}", destination.folder, file.file_name),
            secure_url: format!("https://cdn.test/{}/{}", destination.folder, file.file_name),
            width,
            height,
            bytes: file.byte_len(),
            original_filename: file.file_name.clone(),
            tags: destination.tags.clone(),
            created_at: Utc::now(),
        })
    }
}

struct MockProbe;

#[async_trait]
impl ImageProbe for MockProbe {
    async fn probe(&self, url: &str) -> Result<ImageDimensions, LoadError> {
        if url.contains("missing") {
            Err(LoadError::Unreachable("HTTP 404".to_string()))
        } else {
            Ok(ImageDimensions::new(1200, 800))
        }
    }
}

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<IngestStage>>,
    degraded: Mutex<Vec<IngestStage>>,
    fallbacks: AtomicUsize,
}

impl IngestObserver for RecordingObserver {
    fn stage_changed(&self, _file_name: &str, stage: IngestStage) {
        self.stages.lock().unwrap().push(stage);
    }

    fn stage_degraded(&self, _file_name: &str, stage: IngestStage, _error: &ProcessingError) {
        self.degraded.lock().unwrap().push(stage);
    }

    fn fallback_started(&self, _file_name: &str, _primary: &UploadError) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
    }
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut data), format)
        .unwrap();
    data
}

fn jpeg_file(name: &str, width: u32, height: u32) -> RawFile {
    RawFile::new(name, "image/jpeg", encode(width, height, ImageFormat::Jpeg))
}

fn webp_file(name: &str, width: u32, height: u32) -> RawFile {
    let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let data = ImageProcessor::encode_webp(&img, Quality::FEATURED).unwrap();
    RawFile::new(name, "image/webp", data)
}

fn small_box() -> IngestOptions {
    IngestOptions {
        max_width: 192,
        max_height: 108,
        quality: Quality::FEATURED,
        crop: CropRequest::None,
    }
}

fn pipeline_with(uploader: Arc<MockUploader>, config: PipelineConfig) -> IngestPipeline {
    IngestPipeline::new(config, uploader, Arc::new(MockProbe))
}

fn pipeline(uploader: Arc<MockUploader>) -> IngestPipeline {
    pipeline_with(uploader, PipelineConfig::default())
}

fn destination() -> UploadDestination {
    UploadDestination::new("blog", "unsigned").with_tags(["post"])
}

fn dims_of(data: &[u8]) -> (u32, u32) {
    let dims = ImageProcessor::probe_dimensions(data).unwrap();
    (dims.width, dims.height)
}

#[tokio::test]
async fn test_jpeg_is_downscaled_converted_and_uploaded() {
    let uploader = Arc::new(MockUploader::default());
    let file = jpeg_file("sunset.jpg", 400, 300);
    let original_len = file.byte_len();

    let report = pipeline(uploader.clone())
        .ingest_file_with(file, &ValidationPolicy::default(), &destination(), small_box())
        .await
        .unwrap();

    assert_eq!((report.asset.width, report.asset.height), (144, 108));
    assert_eq!(report.original_bytes, original_len);
    assert!(!report.used_fallback);
    assert!(report.warnings.is_empty());

    let calls = uploader.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].file_name, "sunset.webp");
    assert_eq!(calls[0].content_type, "image/webp");
    assert_eq!(
        ImageProcessor::detect_format(&calls[0].data),
        Some(mediaflow_core::MediaFormat::WebP)
    );
    assert_eq!(dims_of(&calls[0].data), (144, 108));

    let compression = report.compression.unwrap();
    assert_eq!(compression.final_bytes, calls[0].byte_len());
    assert_eq!(report.end_to_end.original_bytes, original_len);
    assert_eq!(report.end_to_end.final_bytes, calls[0].byte_len());
    assert!(report.end_to_end.ratio_percent >= 0.0);
}

#[tokio::test]
async fn test_ingest_file_uses_config_defaults() {
    let uploader = Arc::new(MockUploader::default());
    let config = PipelineConfig {
        max_width: 100,
        max_height: 100,
        ..Default::default()
    };

    let asset = pipeline_with(uploader.clone(), config)
        .with_observer(Arc::new(NoopObserver))
        .ingest_file(jpeg_file("wide.jpg", 300, 150), &ValidationPolicy::default(), &destination())
        .await
        .unwrap();

    assert_eq!((asset.width, asset.height), (100, 50));
    assert_eq!(asset.tags, vec!["post"]);
}

#[tokio::test]
async fn test_small_image_is_not_upscaled() {
    let uploader = Arc::new(MockUploader::default());
    let report = pipeline(uploader.clone())
        .ingest_file_with(
            jpeg_file("icon.jpg", 64, 32),
            &ValidationPolicy::default(),
            &destination(),
            small_box(),
        )
        .await
        .unwrap();

    assert_eq!((report.asset.width, report.asset.height), (64, 32));
}

#[tokio::test]
async fn test_oversize_file_never_reaches_uploader() {
    let uploader = Arc::new(MockUploader::default());
    let policy = ValidationPolicy::new(["image/jpeg"], 100);

    let err = pipeline(uploader.clone())
        .ingest_file(jpeg_file("big.jpg", 200, 200), &policy, &destination())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Validation(ValidationError::TooLarge { max: 100, .. })
    ));
    assert_eq!(err.error_code(), "too-large");
    assert!(uploader.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_format_never_reaches_uploader() {
    let uploader = Arc::new(MockUploader::default());
    let file = RawFile::new("doc.pdf", "application/pdf", b"%PDF-1.4".to_vec());

    let err = pipeline(uploader.clone())
        .ingest_file(file, &ValidationPolicy::default(), &destination())
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "unsupported-format");
    assert!(uploader.calls().is_empty());
}

#[tokio::test]
async fn test_webp_within_box_is_uploaded_byte_identical() {
    let uploader = Arc::new(MockUploader::default());
    let file = webp_file("logo.webp", 100, 50);
    let original = file.data.clone();

    let report = pipeline(uploader.clone())
        .ingest_file_with(file, &ValidationPolicy::default(), &destination(), small_box())
        .await
        .unwrap();

    assert!(report.compression.is_none());
    assert_eq!(report.end_to_end.ratio_percent, 0.0);
    assert_eq!(uploader.calls()[0].data, original);
}

#[tokio::test]
async fn test_failed_upload_retries_with_original() {
    let uploader = Arc::new(MockUploader::failing_with(vec![UploadError::Rejected {
        status: 400,
        message: "Invalid image file".to_string(),
    }]));
    let observer = Arc::new(RecordingObserver::default());
    let file = jpeg_file("photo.jpg", 400, 300);
    let original = file.data.clone();

    let report = pipeline(uploader.clone())
        .with_observer(observer.clone())
        .ingest_file_with(file, &ValidationPolicy::default(), &destination(), small_box())
        .await
        .unwrap();

    assert!(report.used_fallback);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Invalid image file"));
    assert_eq!((report.asset.width, report.asset.height), (400, 300));
    assert_eq!(report.end_to_end.final_bytes, original.len() as u64);
    assert_eq!(observer.fallbacks.load(Ordering::SeqCst), 1);

    let calls = uploader.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].content_type, "image/webp");
    assert_eq!(calls[1].data, original);
    assert_eq!(calls[1].file_name, "photo.jpg");
    assert_eq!(calls[1].content_type, "image/jpeg");
}

#[tokio::test]
async fn test_fallback_failure_surfaces_fallback_error() {
    let uploader = Arc::new(MockUploader::failing_with(vec![
        UploadError::Rejected {
            status: 400,
            message: "primary".to_string(),
        },
        UploadError::Rejected {
            status: 400,
            message: "Upload preset not found".to_string(),
        },
    ]));

    let err = pipeline(uploader.clone())
        .ingest_file(jpeg_file("photo.jpg", 400, 300), &ValidationPolicy::default(), &destination())
        .await
        .unwrap_err();

    match err {
        IngestError::Upload(UploadError::Rejected { message, .. }) => {
            assert_eq!(message, "Upload preset not found")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(uploader.calls().len(), 2);
}

#[tokio::test]
async fn test_fallback_disabled_fails_fast() {
    let uploader = Arc::new(MockUploader::failing_with(vec![UploadError::Timeout(30)]));
    let config = PipelineConfig {
        upload_fallback: UploadFallback::Disabled,
        ..Default::default()
    };

    let err = pipeline_with(uploader.clone(), config)
        .ingest_file(jpeg_file("photo.jpg", 400, 300), &ValidationPolicy::default(), &destination())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Upload(UploadError::Timeout(30))));
    assert_eq!(uploader.calls().len(), 1);
}

#[tokio::test]
async fn test_untransformed_upload_is_not_retried() {
    let uploader = Arc::new(MockUploader::failing_with(vec![UploadError::Unreachable(
        "connection refused".to_string(),
    )]));

    let err = pipeline(uploader.clone())
        .ingest_file_with(
            webp_file("logo.webp", 50, 50),
            &ValidationPolicy::default(),
            &destination(),
            small_box(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "upload-unreachable");
    assert_eq!(uploader.calls().len(), 1);
}

#[tokio::test]
async fn test_undecodable_file_is_uploaded_as_is_with_warning() {
    let uploader = Arc::new(MockUploader::default());
    let file = RawFile::new("broken.png", "image/png", b"definitely not a png".to_vec());
    let original = file.data.clone();

    let report = pipeline(uploader.clone())
        .ingest_file_with(file, &ValidationPolicy::default(), &destination(), small_box())
        .await
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.compression.is_none());
    assert_eq!(uploader.calls()[0].data, original);
}

#[tokio::test]
async fn test_invalid_crop_degrades_and_continues() {
    let uploader = Arc::new(MockUploader::default());
    let observer = Arc::new(RecordingObserver::default());
    let options = small_box().with_crop(CropRequest::Explicit(CropSpec {
        x: 350,
        y: 0,
        width: 100,
        height: 100,
        aspect: AspectRatio::SQUARE,
    }));

    let report = pipeline(uploader.clone())
        .with_observer(observer.clone())
        .ingest_file_with(
            jpeg_file("photo.jpg", 400, 300),
            &ValidationPolicy::default(),
            &destination(),
            options,
        )
        .await
        .unwrap();

    assert_eq!(*observer.degraded.lock().unwrap(), vec![IngestStage::Cropping]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("cropping"));
    assert_eq!((report.asset.width, report.asset.height), (144, 108));
}

#[tokio::test]
async fn test_avatar_profile_crops_square() {
    let uploader = Arc::new(MockUploader::default());

    let report = pipeline(uploader.clone())
        .ingest_file_with(
            jpeg_file("me.jpg", 600, 300),
            &ValidationPolicy::default(),
            &destination(),
            IngestProfile::Avatar.options(),
        )
        .await
        .unwrap();

    assert_eq!((report.asset.width, report.asset.height), (300, 300));
}

#[tokio::test]
async fn test_stage_sequence_reported() {
    let uploader = Arc::new(MockUploader::default());
    let observer = Arc::new(RecordingObserver::default());

    pipeline(uploader)
        .with_observer(observer.clone())
        .ingest_file_with(
            jpeg_file("photo.jpg", 400, 300),
            &ValidationPolicy::default(),
            &destination(),
            small_box().with_crop(CropRequest::Centered(AspectRatio::SQUARE)),
        )
        .await
        .unwrap();

    assert_eq!(
        *observer.stages.lock().unwrap(),
        vec![
            IngestStage::Validating,
            IngestStage::Cropping,
            IngestStage::Optimizing,
            IngestStage::Converting,
            IngestStage::Uploading,
            IngestStage::Done,
        ]
    );
}

#[tokio::test]
async fn test_validation_failure_reports_failed_stage() {
    let observer = Arc::new(RecordingObserver::default());
    let file = RawFile::new("empty.png", "image/png", Vec::new());

    let err = pipeline(Arc::new(MockUploader::default()))
        .with_observer(observer.clone())
        .ingest_file(file, &ValidationPolicy::default(), &destination())
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "empty-file");
    assert_eq!(
        *observer.stages.lock().unwrap(),
        vec![IngestStage::Validating, IngestStage::Failed]
    );
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_failures() {
    let uploader = Arc::new(MockUploader::default());
    let policy = ValidationPolicy::new(["image/jpeg", "image/png"], 5 * 1024 * 1024);
    let files = vec![
        jpeg_file("a.jpg", 120, 80),
        RawFile::new("b.gif", "image/gif", b"GIF89a".to_vec()),
        jpeg_file("c.jpg", 90, 60),
        RawFile::new("d.png", "image/png", Vec::new()),
        jpeg_file("e.jpg", 60, 40),
    ];

    let results = pipeline(uploader.clone())
        .ingest_batch(files, &policy, &destination())
        .await;

    let names: Vec<_> = results.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.gif", "c.jpg", "d.png", "e.jpg"]);

    let statuses: Vec<_> = results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            BatchStatus::Success,
            BatchStatus::Error,
            BatchStatus::Success,
            BatchStatus::Error,
            BatchStatus::Success,
        ]
    );
    assert_eq!(results[1].error_code.as_deref(), Some("unsupported-format"));
    assert_eq!(results[3].error_code.as_deref(), Some("empty-file"));
    assert!(results[0].asset.is_some());
    assert!(results[1].asset.is_none());
    assert_eq!(uploader.calls().len(), 3);
}

#[tokio::test]
async fn test_batch_respects_concurrency_limit() {
    let uploader = Arc::new(MockUploader::with_delay(Duration::from_millis(50)));
    let config = PipelineConfig {
        batch_concurrency: 2,
        ..Default::default()
    };
    let files = (0..6)
        .map(|i| jpeg_file(&format!("{i}.jpg"), 40, 30))
        .collect();

    let results = pipeline_with(uploader.clone(), config)
        .ingest_batch(files, &ValidationPolicy::default(), &destination())
        .await;

    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.status == BatchStatus::Success));
    assert!(uploader.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let results = pipeline(Arc::new(MockUploader::default()))
        .ingest_batch(Vec::new(), &ValidationPolicy::default(), &destination())
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_cancelled_ingestion_yields_no_asset() {
    let uploader = Arc::new(MockUploader::with_delay(Duration::from_secs(5)));
    let cancel = CancellationToken::new();
    let pipeline = pipeline(uploader.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = pipeline
        .ingest_file_cancellable(
            jpeg_file("photo.jpg", 400, 300),
            &ValidationPolicy::default(),
            &destination(),
            small_box(),
            cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Cancelled));
}

#[tokio::test]
async fn test_already_cancelled_token_skips_work() {
    let uploader = Arc::new(MockUploader::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline(uploader.clone())
        .ingest_file_cancellable(
            jpeg_file("photo.jpg", 40, 30),
            &ValidationPolicy::default(),
            &destination(),
            small_box(),
            cancel,
        )
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "cancelled");
    assert!(uploader.calls().is_empty());
}

#[tokio::test]
async fn test_ingest_url_normalizes_and_probes() {
    let uploader = Arc::new(MockUploader::default());
    let resolved = pipeline(uploader.clone())
        .ingest_url("https://github.com/acme/site/blob/main/hero.png")
        .await
        .unwrap();

    assert_eq!(
        resolved.secure_url,
        "https://raw.githubusercontent.com/acme/site/main/hero.png"
    );
    assert_eq!((resolved.width, resolved.height), (1200, 800));
    assert!(uploader.calls().is_empty());
}

#[tokio::test]
async fn test_ingest_url_failure_kind() {
    let err = pipeline(Arc::new(MockUploader::default()))
        .ingest_url("https://images.example.com/missing.png")
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Load(_)));
    assert_eq!(err.error_code(), "unreachable-or-not-an-image");
}

#[tokio::test]
async fn test_ingest_dispatches_on_input_kind() {
    let uploader = Arc::new(MockUploader::default());
    let pipeline = pipeline(uploader.clone());
    let policy = ValidationPolicy::default();

    let url = pipeline
        .ingest(
            RawInput::Url("https://drive.google.com/open?id=abc".to_string()),
            &policy,
            &destination(),
        )
        .await
        .unwrap();
    assert!(matches!(url, IngestOutcome::Linked(ref r) if r.secure_url.ends_with("id=abc")));

    let file = pipeline
        .ingest(RawInput::File(jpeg_file("a.jpg", 40, 30)), &policy, &destination())
        .await
        .unwrap();
    assert!(matches!(file, IngestOutcome::Uploaded(_)));
    assert_eq!(uploader.calls().len(), 1);
}
