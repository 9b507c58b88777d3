//! Picks the one stream to download for a request.
//!
//! Audio requests take the best audio-only stream. Video requests take the
//! progressive mp4 stream matching the requested resolution label, and fall
//! back to the highest-resolution progressive stream when there is none. The
//! fallback is reported through [`Selection::substituted`] rather than failing.

use crate::domain::{MediaKind, QualityPreference, StreamDescriptor};

const PREFERRED_CONTAINER: &str = "mp4";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'a> {
    pub stream: &'a StreamDescriptor,
    pub substituted: bool,
}

pub fn select_stream<'a>(
    streams: &'a [StreamDescriptor],
    kind: MediaKind,
    quality: &QualityPreference,
) -> Option<Selection<'a>> {
    match kind {
        MediaKind::Audio => best_audio(streams).map(|stream| Selection {
            stream,
            substituted: false,
        }),
        MediaKind::Video => match quality {
            QualityPreference::Highest => highest_progressive(streams).map(|stream| Selection {
                stream,
                substituted: false,
            }),
            QualityPreference::Resolution(label) => match exact_progressive(streams, label) {
                Some(stream) => Some(Selection {
                    stream,
                    substituted: false,
                }),
                None => highest_progressive(streams).map(|stream| Selection {
                    stream,
                    substituted: true,
                }),
            },
        },
    }
}

/// Highest bitrate audio-only stream; the first one wins a tie.
fn best_audio(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    streams
        .iter()
        .filter(|s| s.is_audio_only())
        .fold(None, |best: Option<&StreamDescriptor>, candidate| match best {
            Some(current) if candidate.bitrate.unwrap_or(0.0) <= current.bitrate.unwrap_or(0.0) => {
                Some(current)
            }
            _ => Some(candidate),
        })
}

/// Tallest progressive stream, preferring mp4 on equal height, then enumeration order.
fn highest_progressive(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    let rank = |s: &StreamDescriptor| {
        (
            s.height.unwrap_or(0),
            s.container_extension == PREFERRED_CONTAINER,
        )
    };

    streams
        .iter()
        .filter(|s| s.is_progressive)
        .fold(None, |best: Option<&StreamDescriptor>, candidate| match best {
            Some(current) if rank(candidate) <= rank(current) => Some(current),
            _ => Some(candidate),
        })
}

fn exact_progressive<'a>(
    streams: &'a [StreamDescriptor],
    label: &str,
) -> Option<&'a StreamDescriptor> {
    streams.iter().find(|s| {
        s.is_progressive
            && s.container_extension == PREFERRED_CONTAINER
            && s.resolution_label.as_deref() == Some(label)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StreamSource;

    fn progressive(id: &str, height: u32, ext: &str) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind: MediaKind::Video,
            resolution_label: Some(format!("{}p", height)),
            height: Some(height),
            is_progressive: true,
            container_extension: ext.to_string(),
            bitrate: None,
            size_estimate: None,
            source: StreamSource::default(),
        }
    }

    fn video_only(id: &str, height: u32) -> StreamDescriptor {
        StreamDescriptor {
            is_progressive: false,
            ..progressive(id, height, "mp4")
        }
    }

    fn audio(id: &str, kbps: f32) -> StreamDescriptor {
        StreamDescriptor {
            format_id: id.to_string(),
            kind: MediaKind::Audio,
            resolution_label: None,
            height: None,
            is_progressive: false,
            container_extension: "m4a".to_string(),
            bitrate: Some(kbps),
            size_estimate: None,
            source: StreamSource::default(),
        }
    }

    fn res(label: &str) -> QualityPreference {
        QualityPreference::Resolution(label.to_string())
    }

    #[test]
    fn test_exact_resolution_match() {
        let streams = vec![
            progressive("18", 360, "mp4"),
            progressive("22", 720, "mp4"),
            video_only("137", 1080),
        ];

        let selection = select_stream(&streams, MediaKind::Video, &res("720p")).unwrap();
        assert_eq!(selection.stream.format_id, "22");
        assert!(!selection.substituted);
    }

    #[test]
    fn test_missing_resolution_falls_back_to_highest_progressive() {
        let streams = vec![video_only("137", 1080), progressive("18", 360, "mp4")];

        let selection = select_stream(&streams, MediaKind::Video, &res("1080p")).unwrap();
        assert_eq!(selection.stream.format_id, "18");
        assert!(selection.substituted);
    }

    #[test]
    fn test_fallback_for_any_unknown_label() {
        let streams = vec![progressive("18", 360, "mp4"), progressive("43", 480, "webm")];

        for label in ["1080p", "144p", "garbage", ""] {
            let selection = select_stream(&streams, MediaKind::Video, &res(label)).unwrap();
            assert_eq!(selection.stream.format_id, "43", "label {:?}", label);
            assert!(selection.substituted);
        }
    }

    #[test]
    fn test_exact_match_requires_mp4() {
        let streams = vec![progressive("43", 480, "webm"), progressive("18", 360, "mp4")];

        let selection = select_stream(&streams, MediaKind::Video, &res("480p")).unwrap();
        assert_eq!(selection.stream.format_id, "43");
        assert!(selection.substituted);
    }

    #[test]
    fn test_highest_prefers_mp4_then_first() {
        let streams = vec![
            progressive("43", 720, "webm"),
            progressive("22", 720, "mp4"),
            progressive("23", 720, "mp4"),
            progressive("18", 360, "mp4"),
        ];

        let selection =
            select_stream(&streams, MediaKind::Video, &QualityPreference::Highest).unwrap();
        assert_eq!(selection.stream.format_id, "22");
        assert!(!selection.substituted);
    }

    #[test]
    fn test_no_progressive_stream_is_not_found() {
        let streams = vec![video_only("137", 1080), audio("140", 128.0)];

        assert!(select_stream(&streams, MediaKind::Video, &res("720p")).is_none());
        assert!(select_stream(&streams, MediaKind::Video, &QualityPreference::Highest).is_none());
    }

    #[test]
    fn test_audio_picks_highest_bitrate() {
        let streams = vec![
            audio("139", 48.0),
            audio("140", 129.5),
            audio("141", 129.5),
            progressive("18", 360, "mp4"),
        ];

        let selection =
            select_stream(&streams, MediaKind::Audio, &QualityPreference::Highest).unwrap();
        assert_eq!(selection.stream.format_id, "140");
    }

    #[test]
    fn test_audio_never_returns_video() {
        let streams = vec![
            progressive("18", 360, "mp4"),
            video_only("137", 1080),
        ];

        assert!(select_stream(&streams, MediaKind::Audio, &res("720p")).is_none());

        let mut with_audio = streams.clone();
        with_audio.push(audio("140", 128.0));
        let selection = select_stream(&with_audio, MediaKind::Audio, &res("720p")).unwrap();
        assert_eq!(selection.stream.kind, MediaKind::Audio);
        assert!(!selection.stream.is_progressive);
    }
}
