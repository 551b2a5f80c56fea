use mediaflow_core::{normalize_mime, MediaFormat, RawFile, ValidationError, ValidationPolicy};
use std::path::Path;

use crate::image::ImageProcessor;

/// Check a declared content type and size against `policy`.
///
/// Checks run in order: format, emptiness, size. Pure; never touches the bytes.
pub fn validate(
    content_type: &str,
    byte_length: u64,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    if !policy.allows(content_type) {
        return Err(ValidationError::UnsupportedFormat {
            content_type: normalize_mime(content_type),
            allowed: policy.allowed_types.clone(),
        });
    }

    if byte_length == 0 {
        return Err(ValidationError::EmptyFile);
    }

    if byte_length > policy.max_bytes {
        return Err(ValidationError::TooLarge {
            size: byte_length,
            max: policy.max_bytes,
        });
    }

    Ok(())
}

/// Media file validator
///
/// Runs [`validate`] and, when the policy asks for it, compares the file's
/// magic bytes with the declared type.
pub struct MediaValidator<'a> {
    policy: &'a ValidationPolicy,
}

impl<'a> MediaValidator<'a> {
    pub fn new(policy: &'a ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn validate_file(&self, file: &RawFile) -> Result<(), ValidationError> {
        validate(&file.content_type, file.byte_len(), self.policy)?;
        if self.policy.verify_signature {
            self.validate_signature(file)?;
        }
        Ok(())
    }

    /// Reject files whose contents are a definite, different image format.
    /// Unrecognised signatures pass; decoding catches them later.
    pub fn validate_signature(&self, file: &RawFile) -> Result<(), ValidationError> {
        let declared = MediaFormat::from_mime(&file.content_type);
        let detected = ImageProcessor::detect_format(&file.data);

        match (declared, detected) {
            (Some(declared), Some(detected)) if declared != detected => {
                tracing::debug!(
                    file_name = %file.file_name,
                    declared = %declared,
                    detected = %detected,
                    "Content-Type does not match file signature"
                );
                Err(ValidationError::ContentMismatch {
                    declared: declared.to_mime_type().to_string(),
                    detected: detected.to_mime_type().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Image content type for a file name, from its extension.
pub fn content_type_for_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename).extension().and_then(|e| e.to_str())?;
    MediaFormat::from_extension(extension).map(MediaFormat::to_mime_type)
}
