//! Caller-facing ingestion inputs, options and reports.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::media::{normalize_mime, Quality};
use crate::models::{Asset, CompressionStats};

/// A user-supplied file: raw bytes plus the declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl RawFile {
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    File(RawFile),
    Url(String),
}

/// Width-to-height proportion, e.g. `16:9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid {
                key: "aspect_ratio",
                message: format!("{}:{} has a zero term", width, height),
            });
        }
        Ok(Self { width, height })
    }

    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl FromStr for AspectRatio {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Invalid {
            key: "aspect_ratio",
            message: format!("expected W:H, got '{}'", s),
        };
        let (w, h) = s.trim().split_once(':').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        AspectRatio::new(width, height)
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Crop rectangle in source pixels plus the aspect it must honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub aspect: AspectRatio,
}

impl CropSpec {
    /// Largest rectangle of `aspect` centered in an `img_w` x `img_h` image.
    ///
    /// Returns `None` when the image has a zero dimension.
    pub fn centered(img_w: u32, img_h: u32, aspect: AspectRatio) -> Option<Self> {
        if img_w == 0 || img_h == 0 {
            return None;
        }

        let target = aspect.as_f64();
        let (width, height) = if (img_w as f64 / img_h as f64) > target {
            let w = ((img_h as f64) * target).round() as u32;
            (w.clamp(1, img_w), img_h)
        } else {
            let h = ((img_w as f64) / target).round() as u32;
            (img_w, h.clamp(1, img_h))
        };

        Some(Self {
            x: (img_w - width) / 2,
            y: (img_h - height) / 2,
            width,
            height,
            aspect,
        })
    }

    /// True when one side is within one pixel of the exact `aspect` size
    /// for the other side.
    pub fn matches_aspect(&self) -> bool {
        let (aw, ah) = (self.aspect.width as u64, self.aspect.height as u64);
        let lhs = self.height as u64 * aw;
        let rhs = self.width as u64 * ah;
        lhs.abs_diff(rhs) <= aw.max(ah)
    }
}

/// Whether and how to crop before optimizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropRequest {
    /// Skip cropping (the user cancelled the cropper).
    #[default]
    None,
    Explicit(CropSpec),
    /// Largest centered rectangle of the given aspect, computed once the
    /// image dimensions are known.
    Centered(AspectRatio),
}

/// Per-call transformation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestOptions {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
    pub crop: CropRequest,
}

impl IngestOptions {
    pub fn with_crop(mut self, crop: CropRequest) -> Self {
        self.crop = crop;
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestProfile::Featured.options()
    }
}

/// Call-site presets for the places that accept images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestProfile {
    Featured,
    Library,
    Avatar,
}

impl IngestProfile {
    pub fn options(self) -> IngestOptions {
        match self {
            IngestProfile::Featured => IngestOptions {
                max_width: 1920,
                max_height: 1080,
                quality: Quality::FEATURED,
                crop: CropRequest::None,
            },
            IngestProfile::Library => IngestOptions {
                max_width: 2048,
                max_height: 2048,
                quality: Quality::LIBRARY,
                crop: CropRequest::None,
            },
            IngestProfile::Avatar => IngestOptions {
                max_width: 400,
                max_height: 400,
                quality: Quality::FEATURED,
                crop: CropRequest::Centered(AspectRatio::SQUARE),
            },
        }
    }
}

impl FromStr for IngestProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "featured" => Ok(IngestProfile::Featured),
            "library" => Ok(IngestProfile::Library),
            "avatar" => Ok(IngestProfile::Avatar),
            other => Err(ConfigError::Invalid {
                key: "profile",
                message: format!("unknown profile '{}'", other),
            }),
        }
    }
}

/// Where and how an upload lands remotely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadDestination {
    pub folder: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub preset_name: String,
}

impl UploadDestination {
    pub fn new(folder: impl Into<String>, preset_name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            tags: Vec::new(),
            preset_name: preset_name.into(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Acceptance rules applied before any transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    pub allowed_types: Vec<String>,
    pub max_bytes: u64,
    /// Reject files whose magic bytes name a different image format.
    #[serde(default)]
    pub verify_signature: bool,
}

impl ValidationPolicy {
    pub fn new<I, S>(allowed_types: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_types: allowed_types
                .into_iter()
                .map(|t| normalize_mime(t.as_ref()))
                .collect(),
            max_bytes,
            verify_signature: false,
        }
    }

    pub fn with_signature_check(mut self, enabled: bool) -> Self {
        self.verify_signature = enabled;
        self
    }

    pub fn allows(&self, content_type: &str) -> bool {
        let normalized = normalize_mime(content_type);
        self.allowed_types
            .iter()
            .any(|allowed| normalize_mime(allowed) == normalized)
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy::new(
            ["image/jpeg", "image/png", "image/gif", "image/webp"],
            10 * 1024 * 1024,
        )
        .with_signature_check(true)
    }
}

/// Stages of one ingestion, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStage {
    Validating,
    Cropping,
    Optimizing,
    Converting,
    Uploading,
    Done,
    Failed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Validating => "validating",
            IngestStage::Cropping => "cropping",
            IngestStage::Optimizing => "optimizing",
            IngestStage::Converting => "converting",
            IngestStage::Uploading => "uploading",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestStage::Done | IngestStage::Failed)
    }
}

impl Display for IngestStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Everything a caller may want to know about one successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub asset: Asset,
    /// Size of the validated input file.
    pub original_bytes: u64,
    /// Stats of the format-conversion stage alone, relative to its input.
    /// `None` when conversion was a no-op or degraded.
    pub compression: Option<CompressionStats>,
    /// Original upload versus the bytes actually sent to storage.
    pub end_to_end: CompressionStats,
    /// Non-fatal stage failures that were degraded around.
    pub warnings: Vec<String>,
    pub used_fallback: bool,
}
