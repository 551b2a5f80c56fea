use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored image as reported by the remote storage service.
///
/// Dimensions and byte size always come from the remote response, never
/// from locally computed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub public_id: String,
    pub secure_url: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub original_filename: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Byte-size change produced by one re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_bytes: u64,
    pub final_bytes: u64,
    /// Percentage saved, one decimal place, never negative.
    pub ratio_percent: f64,
}

impl CompressionStats {
    pub fn compute(original_bytes: u64, final_bytes: u64) -> Self {
        let ratio_percent = if original_bytes == 0 {
            0.0
        } else {
            let saved = (1.0 - final_bytes as f64 / original_bytes as f64) * 100.0;
            ((saved * 10.0).round() / 10.0).max(0.0)
        };

        Self {
            original_bytes,
            final_bytes,
            ratio_percent,
        }
    }

    /// Signed byte difference; negative when the output grew.
    pub fn saved_bytes(&self) -> i64 {
        self.original_bytes as i64 - self.final_bytes as i64
    }

    pub fn grew(&self) -> bool {
        self.final_bytes > self.original_bytes
    }
}

/// Result of URL-based ingestion: the normalized URL and its natural size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImage {
    pub secure_url: String,
    pub width: u32,
    pub height: u32,
}
