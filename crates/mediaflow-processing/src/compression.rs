use mediaflow_core::{CompressionStats, MediaFormat, ProcessedBuffer, ProcessingError, Quality};

use crate::image::ImageProcessor;

/// Output of one format conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub buffer: ProcessedBuffer,
    /// `None` when the input was already WebP and nothing was re-encoded.
    pub stats: Option<CompressionStats>,
}

impl Conversion {
    /// A conversion that changed nothing.
    pub fn unchanged(buffer: ProcessedBuffer) -> Self {
        Self {
            buffer,
            stats: None,
        }
    }
}

/// Lossy WebP re-encoder.
pub struct FormatConverter;

impl FormatConverter {
    /// Re-encode `buffer` as WebP at `quality`.
    ///
    /// WebP input is returned byte-identical. The output may be larger than
    /// the input; that is reported, not rejected.
    pub fn convert(
        buffer: &ProcessedBuffer,
        quality: Quality,
    ) -> Result<Conversion, ProcessingError> {
        if buffer.format == MediaFormat::WebP {
            return Ok(Conversion::unchanged(buffer.clone()));
        }

        let img = ImageProcessor::decode(&buffer.data)?;
        let data = ImageProcessor::encode_webp(&img, quality)?;
        let stats = CompressionStats::compute(buffer.byte_len(), data.len() as u64);

        tracing::debug!(
            from_format = %buffer.format,
            original_bytes = stats.original_bytes,
            final_bytes = stats.final_bytes,
            ratio_percent = stats.ratio_percent,
            quality = quality.value(),
            "Converted image to WebP"
        );

        Ok(Conversion {
            buffer: ProcessedBuffer::new(data, MediaFormat::WebP, img.width(), img.height()),
            stats: Some(stats),
        })
    }
}
