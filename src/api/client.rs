use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use url::Url;

use super::models::{ResolverConfig, VideoInfoResponse};
use super::resolver::{MediaResolver, ResolveError, Result};
use crate::domain::{ProgressObserver, ResolvedMedia, StreamDescriptor, StreamSource};
use crate::utils::{extract_video_id, sanitize_filename};

const SUPPORTED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

const INVALID_URL_MARKERS: &[&str] = &[
    "Unsupported URL",
    "is not a valid URL",
    "Incomplete YouTube ID",
];

const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "has been removed",
    "Sign in to confirm your age",
    "members-only",
    "This video is not available",
    "is not available in your country",
];

/// yt-dlp's own format errors, which say nothing about the video itself.
const FORMAT_MARKERS: &[&str] = &["Requested format is not available"];

/// Map a failed yt-dlp run onto the resolver error kinds.
pub fn classify_failure(stderr: &str) -> ResolveError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .to_string();

    if FORMAT_MARKERS.iter().any(|m| stderr.contains(m)) {
        ResolveError::Process(message)
    } else if INVALID_URL_MARKERS.iter().any(|m| stderr.contains(m)) {
        ResolveError::InvalidUrl(message)
    } else if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
        ResolveError::VideoUnavailable(message)
    } else {
        ResolveError::Process(message)
    }
}

/// Leaves room for the extension and ".part" under the usual 255-byte name limit.
const MAX_BASE_NAME_BYTES: usize = 200;

fn truncate_to_bytes(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].trim_end_matches(|c| c == '.' || c == ' ')
}

fn output_path(destination: &Path, media: &ResolvedMedia, stream: &StreamDescriptor) -> PathBuf {
    let mut base = truncate_to_bytes(&sanitize_filename(&media.metadata.title), MAX_BASE_NAME_BYTES)
        .to_string();
    if base.is_empty() {
        base = sanitize_filename(&media.metadata.id);
    }
    if base.is_empty() {
        base = "video".to_string();
    }
    destination.join(format!("{}.{}", base, stream.container_extension))
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn transfer_progress(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(t) if t > 0 => (downloaded as f32 / t as f32).min(1.0),
        _ => 0.0,
    }
}

#[derive(Clone)]
pub struct YtDlpClient {
    config: ResolverConfig,
    http: Client,
}

impl YtDlpClient {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn binary_name(&self) -> String {
        self.config.binary.display().to_string()
    }

    /// Logs the installed yt-dlp version, or a warning if it cannot be run.
    pub async fn check_availability(&self) -> bool {
        match Command::new(&self.config.binary).arg("--version").output().await {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("yt-dlp is available, version: {}", version.trim());
                true
            }
            Ok(_) => {
                warn!("yt-dlp --version failed");
                false
            }
            Err(e) => {
                warn!("yt-dlp not found ({}): {}", self.binary_name(), e);
                false
            }
        }
    }

    async fn dump_json(&self, url: &str) -> Result<VideoInfoResponse> {
        debug!("Extracting metadata with yt-dlp for: {}", url);

        let output = tokio::time::timeout(
            self.config.timeout,
            Command::new(&self.config.binary)
                .arg("--dump-json")
                .arg("--no-download")
                .arg("--no-warnings")
                .arg("--no-playlist")
                .arg(url)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ResolveError::Timeout(self.config.timeout.as_secs()))?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResolveError::ToolNotFound(self.binary_name()),
            _ => ResolveError::Io(e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(classify_failure(&stderr));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        Ok(serde_json::from_str(&json_str)?)
    }

    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        source: &StreamSource,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let mut request = self.http.get(&source.url);
        for (name, value) in &source.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ResolveError::HttpStatus(e.to_string()))?;

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ResolveError::RequestError);

        Ok((total_size, stream))
    }

    async fn write_stream(
        &self,
        stream: &StreamDescriptor,
        path: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        let (content_length, body) = self.download_file_stream(&stream.source).await?;
        let total = content_length.or(stream.size_estimate);
        let mut body = std::pin::pin!(body);

        let mut file = tokio::fs::File::create(path).await?;
        let mut downloaded: u64 = 0;
        observer.transfer(0.0);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            observer.transfer(transfer_progress(downloaded, total));
        }

        file.flush().await?;
        file.sync_all().await?;
        debug!("Wrote {} bytes to {}", downloaded, path.display());
        Ok(())
    }
}

#[async_trait]
impl MediaResolver for YtDlpClient {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn supports_url(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
            && url
                .host_str()
                .is_some_and(|host| SUPPORTED_HOSTS.contains(&host))
            && extract_video_id(url.as_str()).is_some()
    }

    async fn resolve(&self, url: &str) -> Result<ResolvedMedia> {
        let media = self.dump_json(url).await?.into_resolved();
        debug!(
            "Resolved {} with {} direct streams",
            media.metadata.id,
            media.streams.len()
        );
        Ok(media)
    }

    async fn retrieve(
        &self,
        media: &ResolvedMedia,
        stream: &StreamDescriptor,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf> {
        let path = output_path(destination, media, stream);
        let part = part_path(&path);
        info!(
            "Downloading format {} of {} to {}",
            stream.format_id,
            media.metadata.id,
            path.display()
        );

        match self.write_stream(stream, &part, observer).await {
            Ok(()) => {
                tokio::fs::rename(&part, &path).await?;
                Ok(path)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                    debug!("No partial file to clean up: {}", cleanup);
                }
                Err(e)
            }
        }
    }
}
