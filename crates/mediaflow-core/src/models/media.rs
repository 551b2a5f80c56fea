//! Image buffer and format types that flow between pipeline stages.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::ConfigError;

/// Strip MIME parameters (`; charset=...`) and lowercase.
pub fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Raster formats the pipeline knows how to tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Avif,
    Bmp,
    Tiff,
}

impl MediaFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match normalize_mime(mime).as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(MediaFormat::Jpeg),
            "image/png" => Some(MediaFormat::Png),
            "image/gif" => Some(MediaFormat::Gif),
            "image/webp" => Some(MediaFormat::WebP),
            "image/avif" => Some(MediaFormat::Avif),
            "image/bmp" => Some(MediaFormat::Bmp),
            "image/tiff" => Some(MediaFormat::Tiff),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "jpg" | "jpeg" | "jfif" => Some(MediaFormat::Jpeg),
            "png" => Some(MediaFormat::Png),
            "gif" => Some(MediaFormat::Gif),
            "webp" => Some(MediaFormat::WebP),
            "avif" => Some(MediaFormat::Avif),
            "bmp" => Some(MediaFormat::Bmp),
            "tif" | "tiff" => Some(MediaFormat::Tiff),
            _ => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Avif => "image/avif",
            MediaFormat::Bmp => "image/bmp",
            MediaFormat::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Gif => "gif",
            MediaFormat::WebP => "webp",
            MediaFormat::Avif => "avif",
            MediaFormat::Bmp => "bmp",
            MediaFormat::Tiff => "tiff",
        }
    }
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.to_mime_type())
    }
}

/// Natural pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

/// Binary image data plus its format tag and pixel size.
///
/// `data` is a [`Bytes`] handle, so passing a buffer through a stage
/// unchanged never copies the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedBuffer {
    pub data: Bytes,
    pub format: MediaFormat,
    pub width: u32,
    pub height: u32,
}

impl ProcessedBuffer {
    pub fn new(data: impl Into<Bytes>, format: MediaFormat, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            format,
            width,
            height,
        }
    }

    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::new(self.width, self.height)
    }

    pub fn content_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Lossy encode quality in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Quality(f32);

impl Quality {
    /// Primary featured image.
    pub const FEATURED: Quality = Quality(0.90);
    /// Bulk media-library uploads.
    pub const LIBRARY: Quality = Quality(0.85);

    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Quality(value))
        } else {
            Err(ConfigError::InvalidQuality(value))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on libwebp's 0-100 scale.
    pub fn webp_factor(self) -> f32 {
        (self.0 * 100.0).clamp(1.0, 100.0)
    }

    /// Quality on the JPEG encoder's 1-100 scale.
    pub fn jpeg_factor(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::FEATURED
    }
}

impl TryFrom<f32> for Quality {
    type Error = ConfigError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}
