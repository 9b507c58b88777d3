use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Extension given to audio deliverables. The payload is left untouched.
pub const AUDIO_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Requested video quality: either the best available or an exact label such as "720p".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityPreference {
    Highest,
    Resolution(String),
}

impl Default for QualityPreference {
    fn default() -> Self {
        Self::Resolution("720p".to_string())
    }
}

impl FromStr for QualityPreference {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("highest") || s.eq_ignore_ascii_case("best") {
            Ok(Self::Highest)
        } else {
            Ok(Self::Resolution(s.to_string()))
        }
    }
}

impl fmt::Display for QualityPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Highest => write!(f, "Highest"),
            Self::Resolution(label) => write!(f, "{}", label),
        }
    }
}

/// One user-initiated download.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub url: String,
    pub kind: MediaKind,
    pub quality: QualityPreference,
    pub destination: PathBuf,
}

/// Where the bytes of a stream can be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSource {
    pub url: String,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub kind: MediaKind,
    pub resolution_label: Option<String>,
    pub height: Option<u32>,
    /// Carries both audio and video.
    pub is_progressive: bool,
    pub container_extension: String,
    /// kbps
    pub bitrate: Option<f32>,
    pub size_estimate: Option<u64>,
    pub source: StreamSource,
}

impl StreamDescriptor {
    pub fn is_audio_only(&self) -> bool {
        self.kind == MediaKind::Audio && !self.is_progressive
    }

    /// Short human label, e.g. "720p mp4" or "audio m4a (128 kbps)".
    pub fn describe(&self) -> String {
        match (self.kind, &self.resolution_label, self.bitrate) {
            (MediaKind::Video, Some(label), _) => {
                format!("{} {}", label, self.container_extension)
            }
            (MediaKind::Audio, _, Some(kbps)) => {
                format!("audio {} ({:.0} kbps)", self.container_extension, kbps)
            }
            (kind, _, _) => format!("{} {}", kind, self.container_extension),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub author: String,
    pub duration_seconds: u64,
    pub view_count: u64,
}

/// Output of a single resolver call.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub metadata: VideoMetadata,
    pub streams: Vec<StreamDescriptor>,
}

#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub saved_file_path: PathBuf,
    pub selected_stream: StreamDescriptor,
    pub metadata: VideoMetadata,
    /// The requested quality was missing and the highest progressive stream was used.
    pub substituted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    #[default]
    Idle,
    Resolving,
    Downloading,
    Completed,
    Failed,
}
