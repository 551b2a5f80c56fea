//! URL-based ingestion: normalize a share link and confirm it loads as an image.
//!
//! Nothing is downloaded into storage; the normalized URL itself becomes the
//! reference the caller keeps.

use async_trait::async_trait;
use image::ImageReader;
use mediaflow_core::{normalize, ImageDimensions, LoadError, PipelineConfig, ResolvedImage};
use reqwest::Client;
use std::io::Cursor;
use std::time::Duration;

/// Shortest timeout a probe will use, whatever the configuration says.
pub const MIN_RESOLVE_TIMEOUT_SECS: u64 = 3;

/// Loads a URL far enough to learn the image's natural size.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ImageDimensions, LoadError>;
}

/// Normalize `url` and probe the result.
pub async fn resolve(probe: &dyn ImageProbe, url: &str) -> Result<ResolvedImage, LoadError> {
    let normalized = normalize(url);
    if normalized.is_empty() {
        return Err(LoadError::InvalidUrl("URL is empty".to_string()));
    }

    let dims = probe.probe(&normalized).await?;
    Ok(ResolvedImage {
        secure_url: normalized,
        width: dims.width,
        height: dims.height,
    })
}

/// Probe over plain HTTP GET with a timeout and a body-size ceiling.
#[derive(Clone, Debug)]
pub struct HttpImageProbe {
    client: Client,
    timeout_secs: u64,
    max_bytes: u64,
}

impl HttpImageProbe {
    pub fn new(timeout_secs: u64, max_bytes: u64) -> Result<Self, LoadError> {
        let timeout_secs = timeout_secs.max(MIN_RESOLVE_TIMEOUT_SECS);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LoadError::Unreachable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_secs,
            max_bytes,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, LoadError> {
        Self::new(config.resolve_timeout_secs, config.resolve_max_bytes)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    fn classify(&self, err: reqwest::Error) -> LoadError {
        if err.is_timeout() {
            LoadError::Timeout(self.timeout_secs)
        } else {
            LoadError::Unreachable(err.to_string())
        }
    }

    fn too_large(&self) -> LoadError {
        LoadError::NotAnImage(format!("response exceeds {} bytes", self.max_bytes))
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn probe(&self, url: &str) -> Result<ImageDimensions, LoadError> {
        let parsed_url = reqwest::Url::parse(url)
            .map_err(|_| LoadError::InvalidUrl(format!("Invalid URL format: {}", url)))?;

        // Only allow HTTP/HTTPS
        if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
            return Err(LoadError::InvalidUrl(
                "Only HTTP and HTTPS URLs are allowed".to_string(),
            ));
        }

        let mut response = self.client.get(parsed_url).send().await.map_err(|e| {
            tracing::debug!(error = %e, url = %url, "Failed to load image URL");
            self.classify(e)
        })?;

        if !response.status().is_success() {
            return Err(LoadError::Unreachable(format!(
                "URL returned status code: {}",
                response.status()
            )));
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if body.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        let reader = ImageReader::new(Cursor::new(&body))
            .with_guessed_format()
            .map_err(|e| LoadError::NotAnImage(e.to_string()))?;
        if reader.format().is_none() {
            return Err(LoadError::NotAnImage(
                "response is not a recognised image format".to_string(),
            ));
        }
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| LoadError::NotAnImage(e.to_string()))?;

        tracing::debug!(url = %url, width, height, size_bytes = body.len(), "Resolved image URL");
        Ok(ImageDimensions::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe;

    #[async_trait]
    impl ImageProbe for FixedProbe {
        async fn probe(&self, url: &str) -> Result<ImageDimensions, LoadError> {
            if url.starts_with("https://dl.dropboxusercontent.com/") {
                Ok(ImageDimensions::new(800, 600))
            } else {
                Err(LoadError::Unreachable(url.to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_resolve_probes_normalized_url() {
        let resolved = resolve(&FixedProbe, " https://www.dropbox.com/s/abc/cat.png?dl=0 ")
            .await
            .unwrap();
        assert_eq!(resolved.secure_url, "https://dl.dropboxusercontent.com/s/abc/cat.png");
        assert_eq!((resolved.width, resolved.height), (800, 600));
    }

    #[tokio::test]
    async fn test_resolve_empty_url() {
        let err = resolve(&FixedProbe, "   ").await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_http_probe_rejects_non_http_scheme() {
        let probe = HttpImageProbe::new(10, 1024).unwrap();
        let err = probe.probe("ftp://example.com/cat.png").await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl(_)));

        let err = probe.probe("not a url").await.unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl(_)));
    }

    #[test]
    fn test_timeout_floor() {
        let probe = HttpImageProbe::new(0, 1024).unwrap();
        assert_eq!(probe.timeout_secs(), MIN_RESOLVE_TIMEOUT_SECS);
    }
}
