use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{channel::mpsc, stream::BoxStream, StreamExt};
use tracing::{error, info, warn};
use url::Url;

use super::stream_selector::select_stream;
use crate::{
    api::MediaResolver,
    domain::{
        Checkpoint, DownloadError, DownloadResult, MediaKind, MediaRequest, ProgressObserver,
        AUDIO_EXTENSION,
    },
};

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Checkpoint(Checkpoint),
    Progress(f32),
    Finished(Result<DownloadResult, DownloadError>),
}

impl ProgressObserver for mpsc::UnboundedSender<DownloadEvent> {
    fn checkpoint(&self, checkpoint: Checkpoint) {
        let _ = self.unbounded_send(DownloadEvent::Checkpoint(checkpoint));
    }

    fn transfer(&self, progress: f32) {
        let _ = self.unbounded_send(DownloadEvent::Progress(progress));
    }
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    resolver: Arc<dyn MediaResolver>,
}

impl DownloadCoordinator {
    pub fn new(resolver: Arc<dyn MediaResolver>) -> Self {
        Self { resolver }
    }

    fn validate_url(&self, raw: &str) -> Result<Url, DownloadError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DownloadError::InvalidUrl);
        }

        let url = Url::parse(raw).map_err(|_| DownloadError::InvalidUrl)?;
        if !self.resolver.supports_url(&url) {
            return Err(DownloadError::InvalidUrl);
        }
        Ok(url)
    }

    /// Runs one request to completion. Every call is independent; nothing is shared between calls.
    pub async fn download(
        &self,
        request: &MediaRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<DownloadResult, DownloadError> {
        let url = self.validate_url(&request.url)?;

        observer.checkpoint(Checkpoint::Resolving);
        let media = self.resolver.resolve(url.as_str()).await?;
        info!(
            "Resolved \"{}\" by {} ({} streams) via {}",
            media.metadata.title,
            media.metadata.author,
            media.streams.len(),
            self.resolver.name()
        );
        observer.checkpoint(Checkpoint::Resolved(media.metadata.clone()));

        tokio::fs::create_dir_all(&request.destination).await?;

        let selection = select_stream(&media.streams, request.kind, &request.quality)
            .ok_or(DownloadError::NoSuitableStream)?;
        if selection.substituted {
            warn!(
                "Quality {} not available, using {}",
                request.quality,
                selection.stream.describe()
            );
        }

        let stream = selection.stream.clone();
        observer.checkpoint(Checkpoint::Retrieving {
            stream: stream.clone(),
            substituted: selection.substituted,
        });

        let retrieved = self
            .resolver
            .retrieve(&media, &stream, &request.destination, observer)
            .await?;
        observer.checkpoint(Checkpoint::Retrieved(retrieved.clone()));

        let saved_file_path = match request.kind {
            MediaKind::Audio => rename_extension(&retrieved, AUDIO_EXTENSION).await?,
            MediaKind::Video => retrieved,
        };
        info!("Saved {}", saved_file_path.display());

        Ok(DownloadResult {
            saved_file_path,
            selected_stream: stream,
            metadata: media.metadata,
            substituted: selection.substituted,
        })
    }

    /// Drives [`Self::download`] and yields its events, ending with exactly one `Finished`.
    pub fn download_stream(&self, request: MediaRequest) -> BoxStream<'static, DownloadEvent> {
        let (sender, receiver) = mpsc::unbounded();
        let coordinator = self.clone();

        let driver = async move {
            let outcome = coordinator.download(&request, &sender).await;
            if let Err(e) = &outcome {
                error!("Download of {} failed: {}", request.url, e);
            }
            let _ = sender.unbounded_send(DownloadEvent::Finished(outcome));
        };

        // The sender lives in the driver, so the receiver closes right after `Finished`.
        let driver = futures::stream::once(driver)
            .filter_map(|()| futures::future::ready(None::<DownloadEvent>));

        futures::stream::select(receiver, driver).boxed()
    }
}

/// Swap the extension in place. Only the name changes; the bytes are not transcoded.
async fn rename_extension(path: &Path, extension: &str) -> Result<PathBuf, DownloadError> {
    let renamed = path.with_extension(extension);
    if renamed != path {
        tokio::fs::rename(path, &renamed).await?;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resolver::ResolveError;
    use crate::domain::{ResolvedMedia, StreamDescriptor, StreamSource, VideoMetadata};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const VALID_URL: &str = "https://www.youtube.com/watch?v=9bZkp7q19f0";
    const PAYLOAD: &[u8] = b"not really an mp4 container";

    struct StubResolver {
        streams: Vec<StreamDescriptor>,
        failure: Option<fn() -> ResolveError>,
        retrieve_failure: Option<fn() -> ResolveError>,
        resolve_calls: AtomicUsize,
    }

    impl StubResolver {
        fn with_streams(streams: Vec<StreamDescriptor>) -> Self {
            Self {
                streams,
                failure: None,
                retrieve_failure: None,
                resolve_calls: AtomicUsize::new(0),
            }
        }

        fn failing_retrieve(streams: Vec<StreamDescriptor>, failure: fn() -> ResolveError) -> Self {
            Self {
                retrieve_failure: Some(failure),
                ..Self::with_streams(streams)
            }
        }

        fn failing(failure: fn() -> ResolveError) -> Self {
            Self {
                streams: Vec::new(),
                failure: Some(failure),
                retrieve_failure: None,
                resolve_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaResolver for StubResolver {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn supports_url(&self, url: &Url) -> bool {
            url.host_str() == Some("www.youtube.com")
        }

        async fn resolve(&self, _url: &str) -> crate::api::resolver::Result<ResolvedMedia> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(failure) = self.failure {
                return Err(failure());
            }
            Ok(ResolvedMedia {
                metadata: VideoMetadata {
                    id: "video123".to_string(),
                    title: "video123".to_string(),
                    author: "tester".to_string(),
                    duration_seconds: 42,
                    view_count: 1234,
                },
                streams: self.streams.clone(),
            })
        }

        async fn retrieve(
            &self,
            media: &ResolvedMedia,
            stream: &StreamDescriptor,
            destination: &Path,
            _observer: &dyn ProgressObserver,
        ) -> crate::api::resolver::Result<PathBuf> {
            if let Some(failure) = self.retrieve_failure {
                return Err(failure());
            }
            let path = destination.join(format!(
                "{}.{}",
                media.metadata.id, stream.container_extension
            ));
            tokio::fs::write(&path, PAYLOAD).await?;
            Ok(path)
        }
    }

    struct NoProgress;

    impl ProgressObserver for NoProgress {
        fn checkpoint(&self, _checkpoint: Checkpoint) {}
    }

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<&'static str>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn checkpoint(&self, checkpoint: Checkpoint) {
            let name = match checkpoint {
                Checkpoint::Resolving => "resolving",
                Checkpoint::Resolved(_) => "resolved",
                Checkpoint::Retrieving { .. } => "retrieving",
                Checkpoint::Retrieved(_) => "retrieved",
            };
            self.seen.lock().unwrap().push(name);
        }
    }

    fn stream(id: &str, kind: MediaKind, height: Option<u32>, progressive: bool, ext: &str) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind,
            resolution_label: height.map(|h| format!("{}p", h)),
            height,
            is_progressive: progressive,
            container_extension: ext.to_string(),
            bitrate: if kind == MediaKind::Audio { Some(128.0) } else { None },
            size_estimate: None,
            source: StreamSource::default(),
        }
    }

    fn typical_streams() -> Vec<StreamDescriptor> {
        vec![
            stream("18", MediaKind::Video, Some(360), true, "mp4"),
            stream("22", MediaKind::Video, Some(720), true, "mp4"),
            stream("137", MediaKind::Video, Some(1080), false, "mp4"),
            stream("140", MediaKind::Audio, None, false, "mp4"),
        ]
    }

    fn request(kind: MediaKind, quality: &str, destination: &Path) -> MediaRequest {
        MediaRequest {
            url: VALID_URL.to_string(),
            kind,
            quality: quality.parse().unwrap(),
            destination: destination.to_path_buf(),
        }
    }

    fn coordinator(resolver: StubResolver) -> (DownloadCoordinator, Arc<StubResolver>) {
        let resolver = Arc::new(resolver);
        (DownloadCoordinator::new(resolver.clone()), resolver)
    }

    #[tokio::test]
    async fn test_video_download_selects_exact_quality() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = coordinator(StubResolver::with_streams(typical_streams()));
        let observer = RecordingObserver::default();

        let result = coordinator
            .download(&request(MediaKind::Video, "720p", dir.path()), &observer)
            .await
            .unwrap();

        assert_eq!(result.selected_stream.format_id, "22");
        assert!(!result.substituted);
        assert_eq!(result.saved_file_path, dir.path().join("video123.mp4"));
        assert_eq!(
            *observer.seen.lock().unwrap(),
            vec!["resolving", "resolved", "retrieving", "retrieved"]
        );
    }

    #[tokio::test]
    async fn test_missing_quality_substitutes_highest_progressive() {
        let dir = tempfile::tempdir().unwrap();
        let streams = vec![
            stream("137", MediaKind::Video, Some(1080), false, "mp4"),
            stream("18", MediaKind::Video, Some(360), true, "mp4"),
        ];
        let (coordinator, _) = coordinator(StubResolver::with_streams(streams));

        let result = coordinator
            .download(&request(MediaKind::Video, "1080p", dir.path()), &NoProgress)
            .await
            .unwrap();

        assert_eq!(result.selected_stream.format_id, "18");
        assert!(result.substituted);
    }

    #[tokio::test]
    async fn test_audio_without_audio_stream_fails() {
        let dir = tempfile::tempdir().unwrap();
        let streams = vec![stream("18", MediaKind::Video, Some(360), true, "mp4")];
        let (coordinator, _) = coordinator(StubResolver::with_streams(streams));

        let err = coordinator
            .download(&request(MediaKind::Audio, "Highest", dir.path()), &NoProgress)
            .await
            .unwrap_err();

        assert_eq!(err, DownloadError::NoSuitableStream);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_url_never_reaches_resolver() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, resolver) = coordinator(StubResolver::with_streams(typical_streams()));

        for url in ["not a url", "", "   ", "https://vimeo.com/123"] {
            let mut req = request(MediaKind::Video, "720p", dir.path());
            req.url = url.to_string();
            let err = coordinator
                .download(&req, &NoProgress)
                .await
                .unwrap_err();
            assert_eq!(err, DownloadError::InvalidUrl, "url {:?}", url);
        }

        assert_eq!(resolver.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_audio_download_renames_to_mp3() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = coordinator(StubResolver::with_streams(typical_streams()));

        let result = coordinator
            .download(&request(MediaKind::Audio, "Highest", dir.path()), &NoProgress)
            .await
            .unwrap();

        assert_eq!(result.selected_stream.format_id, "140");
        assert_eq!(result.saved_file_path, dir.path().join("video123.mp3"));
        assert!(!dir.path().join("video123.mp4").exists());

        let bytes = std::fs::read(&result.saved_file_path).unwrap();
        assert_eq!(bytes, PAYLOAD);
    }

    #[tokio::test]
    async fn test_failed_audio_retrieval_is_not_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = coordinator(StubResolver::failing_retrieve(typical_streams(), || {
            ResolveError::HttpStatus("HTTP status client error (403 Forbidden)".to_string())
        }));
        let observer = RecordingObserver::default();

        let err = coordinator
            .download(&request(MediaKind::Audio, "Highest", dir.path()), &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Unknown(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(
            *observer.seen.lock().unwrap(),
            vec!["resolving", "resolved", "retrieving"]
        );
    }

    #[tokio::test]
    async fn test_destination_is_created_and_reusable() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("media").join("yt");
        let (coordinator, _) = coordinator(StubResolver::with_streams(typical_streams()));

        for _ in 0..2 {
            coordinator
                .download(&request(MediaKind::Video, "Highest", &nested), &NoProgress)
                .await
                .unwrap();
        }

        assert!(nested.join("video123.mp4").exists());
    }

    #[tokio::test]
    async fn test_resolver_failures_surface_verbatim() {
        let dir = tempfile::tempdir().unwrap();

        let (unavailable, _) = coordinator(StubResolver::failing(|| {
            ResolveError::VideoUnavailable("Private video".to_string())
        }));
        let err = unavailable
            .download(&request(MediaKind::Video, "720p", dir.path()), &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(err, DownloadError::VideoUnavailable);

        let (broken, _) = coordinator(StubResolver::failing(|| {
            ResolveError::Process("ERROR: HTTP Error 503".to_string())
        }));
        let err = broken
            .download(&request(MediaKind::Video, "720p", dir.path()), &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DownloadError::Unknown("yt-dlp failed: ERROR: HTTP Error 503".to_string())
        );
    }

    #[tokio::test]
    async fn test_download_stream_ends_with_finished() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _) = coordinator(StubResolver::with_streams(typical_streams()));

        let events: Vec<DownloadEvent> = coordinator
            .download_stream(request(MediaKind::Video, "720p", dir.path()))
            .collect()
            .await;

        assert!(matches!(
            events.first(),
            Some(DownloadEvent::Checkpoint(Checkpoint::Resolving))
        ));
        match events.last() {
            Some(DownloadEvent::Finished(Ok(result))) => {
                assert_eq!(result.selected_stream.format_id, "22")
            }
            other => panic!("unexpected last event {:?}", other),
        }
        let finished = events
            .iter()
            .filter(|e| matches!(e, DownloadEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
    }
}
