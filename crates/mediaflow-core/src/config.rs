//! Pipeline configuration.
//!
//! `PipelineConfig` is built once (from defaults or `MEDIAFLOW_*` environment
//! variables) and handed to the pipeline at construction. Nothing reads the
//! environment after that.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::models::{IngestOptions, Quality, UploadDestination, ValidationPolicy};

pub const DEFAULT_MAX_WIDTH: u32 = 1920;
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RESOLVE_MAX_BYTES: u64 = 20 * 1024 * 1024;
const DEFAULT_ALLOWED_CONTENT_TYPES: &str = "image/jpeg,image/png,image/gif,image/webp";

/// What to do when uploading the transformed bytes fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadFallback {
    /// Retry once with the original validated file.
    #[default]
    RetryWithOriginal,
    Disabled,
}

impl FromStr for UploadFallback {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" | "retry" => Ok(UploadFallback::RetryWithOriginal),
            "none" | "off" | "disabled" => Ok(UploadFallback::Disabled),
            other => Err(ConfigError::Invalid {
                key: "MEDIAFLOW_UPLOAD_FALLBACK",
                message: format!("expected 'original' or 'none', got '{}'", other),
            }),
        }
    }
}

impl Display for UploadFallback {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadFallback::RetryWithOriginal => write!(f, "original"),
            UploadFallback::Disabled => write!(f, "none"),
        }
    }
}

/// Remote storage endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStorageConfig {
    pub upload_url: String,
    pub browse_url: Option<String>,
    pub upload_preset: String,
    pub folder: String,
    pub tags: Vec<String>,
    pub timeout_secs: u64,
}

impl RemoteStorageConfig {
    pub fn destination(&self) -> UploadDestination {
        UploadDestination::new(&self.folder, &self.upload_preset).with_tags(self.tags.clone())
    }
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            browse_url: None,
            upload_preset: "mediaflow_unsigned".to_string(),
            folder: "mediaflow".to_string(),
            tags: Vec::new(),
            timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
        }
    }
}

/// Immutable configuration for one pipeline instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub storage: RemoteStorageConfig,
    pub validation: ValidationPolicy,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
    pub batch_concurrency: usize,
    pub resolve_timeout_secs: u64,
    pub resolve_max_bytes: u64,
    pub upload_fallback: UploadFallback,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage: RemoteStorageConfig::default(),
            validation: ValidationPolicy::default(),
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: Quality::FEATURED,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT_SECS,
            resolve_max_bytes: DEFAULT_RESOLVE_MAX_BYTES,
            upload_fallback: UploadFallback::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `.env` and `MEDIAFLOW_*` variables.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Absent keys use defaults;
    /// present but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineConfig::default();

        let max_file_size_mb: u64 =
            parse_or("MEDIAFLOW_MAX_FILE_SIZE_MB", &lookup, DEFAULT_MAX_FILE_SIZE_MB)?;
        let max_bytes = max_file_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                key: "MEDIAFLOW_MAX_FILE_SIZE_MB",
                message: format!("{} MB overflows a byte count", max_file_size_mb),
            })?;
        let allowed_content_types = lookup("MEDIAFLOW_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|| DEFAULT_ALLOWED_CONTENT_TYPES.to_string());
        let validation = ValidationPolicy::new(split_list(&allowed_content_types), max_bytes)
            .with_signature_check(defaults.validation.verify_signature);

        let quality = match lookup("MEDIAFLOW_WEBP_QUALITY") {
            Some(raw) => {
                let value = raw.trim().parse::<f32>().map_err(|_| ConfigError::Invalid {
                    key: "MEDIAFLOW_WEBP_QUALITY",
                    message: format!("'{}' is not a number", raw),
                })?;
                Quality::new(value)?
            }
            None => defaults.quality,
        };

        let upload_fallback = match lookup("MEDIAFLOW_UPLOAD_FALLBACK") {
            Some(raw) => raw.parse()?,
            None => defaults.upload_fallback,
        };

        let storage = RemoteStorageConfig {
            upload_url: lookup("MEDIAFLOW_UPLOAD_URL").unwrap_or(defaults.storage.upload_url),
            browse_url: lookup("MEDIAFLOW_BROWSE_URL").or(defaults.storage.browse_url),
            upload_preset: lookup("MEDIAFLOW_UPLOAD_PRESET")
                .unwrap_or(defaults.storage.upload_preset),
            folder: lookup("MEDIAFLOW_UPLOAD_FOLDER").unwrap_or(defaults.storage.folder),
            tags: lookup("MEDIAFLOW_UPLOAD_TAGS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.storage.tags),
            timeout_secs: parse_or(
                "MEDIAFLOW_UPLOAD_TIMEOUT_SECS",
                &lookup,
                defaults.storage.timeout_secs,
            )?,
        };

        let batch_concurrency: usize = parse_or(
            "MEDIAFLOW_BATCH_CONCURRENCY",
            &lookup,
            defaults.batch_concurrency,
        )?;

        let config = PipelineConfig {
            storage,
            validation,
            max_width: parse_or("MEDIAFLOW_MAX_WIDTH", &lookup, defaults.max_width)?,
            max_height: parse_or("MEDIAFLOW_MAX_HEIGHT", &lookup, defaults.max_height)?,
            quality,
            batch_concurrency: batch_concurrency.max(1),
            resolve_timeout_secs: parse_or(
                "MEDIAFLOW_RESOLVE_TIMEOUT_SECS",
                &lookup,
                defaults.resolve_timeout_secs,
            )?,
            resolve_max_bytes: parse_or(
                "MEDIAFLOW_RESOLVE_MAX_BYTES",
                &lookup,
                defaults.resolve_max_bytes,
            )?,
            upload_fallback,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Invalid {
                key: "max_width/max_height",
                message: format!("{}x{} has a zero side", self.max_width, self.max_height),
            });
        }
        if self.validation.allowed_types.is_empty() {
            return Err(ConfigError::Invalid {
                key: "allowed_content_types",
                message: "at least one content type is required".to_string(),
            });
        }
        if self.validation.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_file_size",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.storage.timeout_secs == 0 || self.resolve_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                message: "timeouts must be at least one second".to_string(),
            });
        }
        if self.resolve_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "resolve_max_bytes",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Transformation options implied by this config (no crop).
    pub fn default_options(&self) -> IngestOptions {
        IngestOptions {
            max_width: self.max_width,
            max_height: self.max_height,
            quality: self.quality,
            crop: Default::default(),
        }
    }

    /// Effective batch concurrency, never below one.
    pub fn concurrency(&self) -> usize {
        self.batch_concurrency.max(1)
    }
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            message: format!("'{}' is not a valid value", raw),
        }),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
