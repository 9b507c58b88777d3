use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{MediaKind, ResolvedMedia, StreamDescriptor, StreamSource, VideoMetadata};

/// Output of `yt-dlp --dump-json` for a single video
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfoResponse {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<f64>,
    pub view_count: Option<u64>,
    #[serde(default)]
    pub formats: Vec<FormatResponse>,
}

/// One entry of the `formats` array
#[derive(Debug, Clone, Deserialize)]
pub struct FormatResponse {
    pub format_id: String,
    pub ext: String,
    pub url: Option<String>,
    pub protocol: Option<String>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub format_note: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub abr: Option<f64>,
    pub tbr: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

fn has_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != "none")
}

/// "720p60" and "1080p HDR" both give the leading "<n>p".
fn label_from_note(note: &str) -> Option<String> {
    let digits: String = note.chars().take_while(char::is_ascii_digit).collect();
    if !digits.is_empty() && note[digits.len()..].starts_with('p') {
        Some(format!("{}p", digits))
    } else {
        None
    }
}

impl FormatResponse {
    /// Quality label as YouTube names it. Portrait videos are labelled by their short side.
    fn resolution_label(&self) -> Option<String> {
        if let Some(label) = self.format_note.as_deref().and_then(label_from_note) {
            return Some(label);
        }
        let short_side = match (self.width, self.height) {
            (Some(w), Some(h)) => Some(w.min(h)),
            (_, h) => h,
        };
        short_side.map(|side| format!("{}p", side))
    }

    /// Plain HTTP transfers only; manifests and storyboards are skipped.
    fn is_direct(&self) -> bool {
        matches!(self.protocol.as_deref(), Some("https") | Some("http") | None)
            && self
                .url
                .as_deref()
                .is_some_and(|u| u.starts_with("https://") || u.starts_with("http://"))
    }

    pub fn into_descriptor(self) -> Option<StreamDescriptor> {
        if !self.is_direct() {
            return None;
        }

        let has_video = has_codec(self.vcodec.as_deref());
        let has_audio = has_codec(self.acodec.as_deref());

        let kind = match (has_video, has_audio) {
            (true, _) => MediaKind::Video,
            (false, true) => MediaKind::Audio,
            (false, false) => return None,
        };

        let resolution_label = match kind {
            MediaKind::Video => self.resolution_label(),
            MediaKind::Audio => None,
        };

        let bitrate = match kind {
            MediaKind::Audio => self.abr.or(self.tbr),
            MediaKind::Video => self.tbr,
        };

        Some(StreamDescriptor {
            format_id: self.format_id,
            kind,
            resolution_label,
            height: self.height,
            is_progressive: has_video && has_audio,
            container_extension: self.ext,
            bitrate: bitrate.map(|b| b as f32),
            size_estimate: self.filesize.or(self.filesize_approx),
            source: StreamSource {
                url: self.url.unwrap_or_default(),
                headers: self.http_headers,
            },
        })
    }
}

impl VideoInfoResponse {
    pub fn into_resolved(self) -> ResolvedMedia {
        let metadata = VideoMetadata {
            author: self
                .uploader
                .or(self.channel)
                .unwrap_or_else(|| "Unknown".to_string()),
            title: if self.title.is_empty() {
                self.id.clone()
            } else {
                self.title
            },
            id: self.id,
            duration_seconds: self.duration.map(|d| d as u64).unwrap_or(0),
            view_count: self.view_count.unwrap_or(0),
        };

        let streams = self
            .formats
            .into_iter()
            .filter_map(FormatResponse::into_descriptor)
            .collect();

        ResolvedMedia { metadata, streams }
    }
}

/// Configuration for the yt-dlp resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            timeout: Duration::from_secs(60),
        }
    }
}
