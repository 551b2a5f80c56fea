//! Helpers shared by the `mediaflow` binary.

pub mod telemetry;

pub use telemetry::init_tracing;

use anyhow::{bail, Context};
use mediaflow_core::{
    AspectRatio, Asset, CropRequest, CropSpec, IngestOptions, IngestProfile, RawFile,
    UploadDestination,
};
use mediaflow_processing::content_type_for_extension;
use std::path::Path;

/// Declared type for files whose extension is not a known image type.
/// Validation rejects it with a clear error instead of guessing.
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Parse `x,y,w,h` into its four pixel values.
pub fn parse_crop(value: &str) -> anyhow::Result<(u32, u32, u32, u32)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        bail!("crop must be x,y,width,height, got '{}'", value);
    }

    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("invalid crop value '{}'", part))?;
    }
    Ok((numbers[0], numbers[1], numbers[2], numbers[3]))
}

/// Split a comma separated tag list, dropping blanks.
pub fn parse_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Profile options with the command line crop applied.
///
/// An explicit rectangle uses `aspect` when given, its own proportions
/// otherwise. An aspect alone asks for a centered crop.
pub fn build_options(
    profile: IngestProfile,
    crop: Option<(u32, u32, u32, u32)>,
    aspect: Option<AspectRatio>,
) -> anyhow::Result<IngestOptions> {
    let options = profile.options();
    let request = match (crop, aspect) {
        (Some((x, y, width, height)), aspect) => {
            let aspect = match aspect {
                Some(aspect) => aspect,
                None => AspectRatio::new(width, height)?,
            };
            CropRequest::Explicit(CropSpec {
                x,
                y,
                width,
                height,
                aspect,
            })
        }
        (None, Some(aspect)) => CropRequest::Centered(aspect),
        (None, None) => return Ok(options),
    };
    Ok(options.with_crop(request))
}

/// Configured destination with command line overrides.
pub fn build_destination(
    base: UploadDestination,
    folder: Option<String>,
    tags: Option<&str>,
) -> UploadDestination {
    let mut destination = base;
    if let Some(folder) = folder {
        destination.folder = folder;
    }
    if let Some(tags) = tags {
        destination.tags = parse_tags(tags);
    }
    destination
}

/// Read a file from disk, typing it from its extension.
pub async fn read_raw_file(path: &Path) -> anyhow::Result<RawFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = content_type_for_extension(&file_name).unwrap_or(UNKNOWN_CONTENT_TYPE);

    Ok(RawFile::new(file_name, content_type, data))
}

/// Load a media library exported as a JSON array of assets.
pub async fn load_library(path: &Path) -> anyhow::Result<Vec<Asset>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read library {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid library JSON in {}", path.display()))
}
