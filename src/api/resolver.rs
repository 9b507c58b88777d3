use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::{DownloadError, ProgressObserver, ResolvedMedia, StreamDescriptor};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unsupported or malformed URL: {0}")]
    InvalidUrl(String),

    #[error("Video unavailable: {0}")]
    VideoUnavailable(String),

    #[error("yt-dlp not found at '{0}'. Install it with `pip install yt-dlp` or set YTDLP_PATH")]
    ToolNotFound(String),

    #[error("Metadata extraction timed out after {0}s")]
    Timeout(u64),

    #[error("yt-dlp failed: {0}")]
    Process(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Download request failed: {0}")]
    HttpStatus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

impl From<ResolveError> for DownloadError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidUrl(_) => DownloadError::InvalidUrl,
            ResolveError::VideoUnavailable(_) => DownloadError::VideoUnavailable,
            other => DownloadError::Unknown(other.to_string()),
        }
    }
}

/// Turns a page URL into metadata plus streams, and fetches a chosen stream.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Human-readable name of the resolver
    fn name(&self) -> &'static str;

    /// Whether the URL matches a site and shape this resolver accepts.
    /// Checked before any network or process work happens.
    fn supports_url(&self, url: &Url) -> bool;

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia>;

    /// Write the stream into `destination` and return the file it produced.
    async fn retrieve(
        &self,
        media: &ResolvedMedia,
        stream: &StreamDescriptor,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_maps_to_taxonomy() {
        assert_eq!(
            DownloadError::from(ResolveError::InvalidUrl("x".into())),
            DownloadError::InvalidUrl
        );
        assert_eq!(
            DownloadError::from(ResolveError::VideoUnavailable("Private video".into())),
            DownloadError::VideoUnavailable
        );
        assert_eq!(
            DownloadError::from(ResolveError::Timeout(60)),
            DownloadError::Unknown("Metadata extraction timed out after 60s".into())
        );
    }
}
