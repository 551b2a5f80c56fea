//! HTTP implementation of the remote storage service.
//!
//! Uploads are one multipart POST (`file`, `upload_preset`, `folder`, `tags`).
//! Listing is a GET against the browse endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediaflow_core::{Asset, RemoteStorageConfig, UploadDestination, UploadError};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::traits::{AssetCatalog, RemoteUploader, UploadFile};

/// Upload response body as returned by the storage service.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    width: u32,
    height: u32,
    bytes: u64,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<String>,
}

impl UploadResponse {
    fn into_asset(self, fallback_filename: &str) -> Asset {
        let original_filename = self
            .original_filename
            .unwrap_or_else(|| fallback_filename.to_string());
        Asset {
            public_id: self.public_id,
            secure_url: self.secure_url,
            width: self.width,
            height: self.height,
            bytes: self.bytes,
            original_filename,
            tags: self.tags,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}

/// The browse endpoint answers with either a bare array or an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BrowseResponse {
    Bare(Vec<UploadResponse>),
    Envelope { resources: Vec<UploadResponse> },
}

impl BrowseResponse {
    fn into_assets(self) -> Vec<Asset> {
        let resources = match self {
            BrowseResponse::Bare(items) => items,
            BrowseResponse::Envelope { resources } => resources,
        };
        resources
            .into_iter()
            .map(|item| {
                let fallback = file_stem(&item.public_id).to_string();
                item.into_asset(&fallback)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Storage client speaking the multipart upload protocol.
#[derive(Clone, Debug)]
pub struct HttpUploader {
    client: Client,
    upload_url: String,
    browse_url: Option<String>,
    timeout_secs: u64,
}

impl HttpUploader {
    pub fn new(config: &RemoteStorageConfig) -> Result<Self, UploadError> {
        let upload_url = config.upload_url.trim();
        if !(upload_url.starts_with("http://") || upload_url.starts_with("https://")) {
            return Err(UploadError::Configuration(format!(
                "upload URL must be http(s), got '{}'",
                upload_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                UploadError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            upload_url: upload_url.to_string(),
            browse_url: config
                .browse_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from),
            timeout_secs: config.timeout_secs.max(1),
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    fn classify(&self, err: reqwest::Error) -> UploadError {
        if err.is_timeout() {
            UploadError::Timeout(self.timeout_secs)
        } else {
            UploadError::Unreachable(err.to_string())
        }
    }

    async fn rejected(response: Response) -> UploadError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        UploadError::Rejected {
            status: status.as_u16(),
            message: error_message(status.as_u16(), &body),
        }
    }
}

#[async_trait]
impl RemoteUploader for HttpUploader {
    async fn upload(
        &self,
        file: UploadFile,
        destination: &UploadDestination,
    ) -> Result<Asset, UploadError> {
        let size = file.byte_len();
        let part = Part::stream_with_length(file.data.clone(), size)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                UploadError::Configuration(format!(
                    "invalid content type '{}': {}",
                    file.content_type, e
                ))
            })?;

        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", destination.preset_name.clone())
            .text("folder", destination.folder.clone());
        if !destination.tags.is_empty() {
            form = form.text("tags", destination.tags.join(","));
        }

        let start = Instant::now();
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let err = self.classify(e);
                tracing::error!(
                    error = %err,
                    file_name = %file.file_name,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Remote upload failed"
                );
                err
            })?;

        if !response.status().is_success() {
            let err = Self::rejected(response).await;
            tracing::warn!(
                error = %err,
                file_name = %file.file_name,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Remote upload rejected"
            );
            return Err(err);
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| {
                UploadError::InvalidResponse(format!("Failed to parse upload response: {}", e))
            })?;
        let asset = parsed.into_asset(file_stem(&file.file_name));

        tracing::info!(
            public_id = %asset.public_id,
            file_name = %file.file_name,
            size_bytes = size,
            stored_bytes = asset.bytes,
            width = asset.width,
            height = asset.height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote upload successful"
        );

        Ok(asset)
    }
}

#[async_trait]
impl AssetCatalog for HttpUploader {
    async fn list_assets(&self, folder: Option<&str>) -> Result<Vec<Asset>, UploadError> {
        let url = self
            .browse_url
            .as_deref()
            .ok_or_else(|| UploadError::Configuration("browse URL not configured".to_string()))?;

        let mut request = self.client.get(url);
        if let Some(folder) = folder {
            request = request.query(&[("folder", folder)]);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: BrowseResponse = serde_json::from_slice(&body)
            .map_err(|e| {
                UploadError::InvalidResponse(format!("Failed to parse browse response: {}", e))
            })?;
        let assets = parsed.into_assets();

        tracing::debug!(count = assets.len(), folder = ?folder, "Listed remote assets");
        Ok(assets)
    }
}

/// `error.message` from a JSON error body, else the raw body, else the status.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}

/// File name without directories or extension.
fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}
