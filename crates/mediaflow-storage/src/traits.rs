//! Remote storage abstraction
//!
//! The pipeline only needs two things from storage: push one file and get an
//! `Asset` back, and list what is already there for the media library.

use async_trait::async_trait;
use bytes::Bytes;
use mediaflow_core::{Asset, UploadDestination, UploadError};

/// The bytes actually sent to storage for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Single-shot upload to the remote storage service.
///
/// Implementations must not retry internally; retry and fallback policy
/// belongs to the caller.
#[async_trait]
pub trait RemoteUploader: Send + Sync {
    /// Upload one file and return the stored asset as reported by the remote side
    async fn upload(
        &self,
        file: UploadFile,
        destination: &UploadDestination,
    ) -> Result<Asset, UploadError>;
}

/// Read-only listing of previously uploaded assets.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// List assets, optionally restricted to one folder
    async fn list_assets(&self, folder: Option<&str>) -> Result<Vec<Asset>, UploadError>;
}
