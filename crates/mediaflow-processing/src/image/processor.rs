//! Image processor - decode, probe and re-encode

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use mediaflow_core::{ImageDimensions, MediaFormat, ProcessedBuffer, ProcessingError, Quality};
use std::io::Cursor;

/// Largest width or height libwebp can encode.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Identify the format from magic bytes.
    pub fn detect_format(data: &[u8]) -> Option<MediaFormat> {
        let format = image::guess_format(data).ok()?;
        Self::media_format(format)
    }

    fn media_format(format: ImageFormat) -> Option<MediaFormat> {
        match format {
            ImageFormat::Jpeg => Some(MediaFormat::Jpeg),
            ImageFormat::Png => Some(MediaFormat::Png),
            ImageFormat::Gif => Some(MediaFormat::Gif),
            ImageFormat::WebP => Some(MediaFormat::WebP),
            ImageFormat::Avif => Some(MediaFormat::Avif),
            ImageFormat::Bmp => Some(MediaFormat::Bmp),
            ImageFormat::Tiff => Some(MediaFormat::Tiff),
            _ => None,
        }
    }

    /// Read dimensions from the header without decoding pixels.
    pub fn probe_dimensions(data: &[u8]) -> Result<ImageDimensions, ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        Ok(ImageDimensions::new(width, height))
    }

    pub fn decode(data: &[u8]) -> Result<DynamicImage, ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))
    }

    /// Wrap raw upload bytes as the first pipeline buffer.
    ///
    /// The format comes from the magic bytes when recognisable, else from the
    /// declared content type.
    pub fn load(data: Bytes, content_type: &str) -> Result<ProcessedBuffer, ProcessingError> {
        let format = Self::detect_format(&data)
            .or_else(|| MediaFormat::from_mime(content_type))
            .ok_or_else(|| {
                ProcessingError::Decode(format!("unrecognised image format ({})", content_type))
            })?;
        let dims = Self::probe_dimensions(&data)?;
        Ok(ProcessedBuffer::new(data, format, dims.width, dims.height))
    }

    /// Re-encode `img` in `format`.
    ///
    /// JPEG, PNG and WebP are written as such; every other format falls back
    /// to PNG. The returned buffer is tagged with the format actually written.
    pub fn encode(
        img: &DynamicImage,
        format: MediaFormat,
        quality: Quality,
    ) -> Result<ProcessedBuffer, ProcessingError> {
        let (width, height) = img.dimensions();
        let (data, written) = match format {
            MediaFormat::Jpeg => (Self::encode_jpeg(img, quality)?, MediaFormat::Jpeg),
            MediaFormat::WebP => (Self::encode_webp(img, quality)?, MediaFormat::WebP),
            _ => (Self::encode_png(img)?, MediaFormat::Png),
        };
        Ok(ProcessedBuffer::new(data, written, width, height))
    }

    fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Bytes, ProcessingError> {
        let rgb_img = img.to_rgb8();
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_factor());
        encoder
            .encode_image(&rgb_img)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    fn encode_png(img: &DynamicImage) -> Result<Bytes, ProcessingError> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
        Ok(Bytes::from(buffer))
    }

    /// Lossy WebP via libwebp.
    pub fn encode_webp(img: &DynamicImage, quality: Quality) -> Result<Bytes, ProcessingError> {
        let (width, height) = img.dimensions();
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(ProcessingError::TooLargeForFormat {
                width,
                height,
                max: WEBP_MAX_DIMENSION,
            });
        }

        // Convert to RGBA for WebP encoding
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(quality.webp_factor());
        if webp_data.is_empty() {
            return Err(ProcessingError::Encode("WebP encoder produced no data".to_string()));
        }

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}
