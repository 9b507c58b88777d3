use std::path::PathBuf;

use iced::{
    widget::{
        button, column, pick_list, progress_bar, radio, row, scrollable, text, text_input, Column,
        Space,
    },
    Alignment, Element, Length,
};

use crate::domain::{DownloadPhase, MediaKind, MediaRequest};

pub static QUALITY_OPTIONS: [&str; 5] = ["Highest", "1080p", "720p", "480p", "360p"];

const READY_MESSAGE: &str = "Ready to download...";
const URL_EXAMPLE: &str = "Example: https://www.youtube.com/watch?v=9bZkp7q19f0";

/// Main view state
pub struct DownloadView {
    pub youtube_url: String,
    pub kind: MediaKind,
    pub quality: &'static str,
    pub destination: String,
    pub status_message: String,
    pub phase: DownloadPhase,
    pub is_downloading: bool,
    pub download_progress: f32,
    pub info_lines: Vec<String>,
    /// The request being downloaded. The form may change while it runs.
    pub active_request: Option<MediaRequest>,
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    KindSelected(MediaKind),
    QualitySelected(&'static str),
    DestinationChanged(String),
    BrowsePressed,
    DownloadPressed,
    ClearPressed,
}

impl DownloadView {
    pub fn new(destination: String) -> Self {
        Self {
            youtube_url: String::new(),
            kind: MediaKind::Video,
            quality: "720p",
            destination,
            status_message: READY_MESSAGE.to_string(),
            phase: DownloadPhase::Idle,
            is_downloading: false,
            download_progress: 0.0,
            info_lines: Vec::new(),
            active_request: None,
        }
    }

    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.youtube_url = url;
            }
            DownloadMessage::KindSelected(kind) => {
                self.kind = kind;
            }
            DownloadMessage::QualitySelected(quality) => {
                self.quality = quality;
            }
            DownloadMessage::DestinationChanged(destination) => {
                self.destination = destination;
            }
            DownloadMessage::ClearPressed => {
                self.youtube_url.clear();
                self.info_lines.clear();
                self.download_progress = 0.0;
                if !self.is_downloading {
                    self.phase = DownloadPhase::Idle;
                    self.status_message = READY_MESSAGE.to_string();
                }
            }
            DownloadMessage::BrowsePressed | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    /// None while the URL box is empty.
    pub fn build_request(&self) -> Option<MediaRequest> {
        let url = self.youtube_url.trim();
        if url.is_empty() {
            return None;
        }

        Some(MediaRequest {
            url: url.to_string(),
            kind: self.kind,
            quality: self.quality.parse().unwrap_or_default(),
            destination: PathBuf::from(self.destination.trim()),
        })
    }

    pub fn push_info(&mut self, line: impl Into<String>) {
        self.info_lines.push(line.into());
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let idle = !self.is_downloading;

        let kind_row = row![
            text("Download as:"),
            radio(
                "Video",
                MediaKind::Video,
                Some(self.kind),
                DownloadMessage::KindSelected
            ),
            radio(
                "Audio (MP3)",
                MediaKind::Audio,
                Some(self.kind),
                DownloadMessage::KindSelected
            ),
        ]
        .spacing(20)
        .align_y(Alignment::Center);

        let quality_row = row![
            text("Quality:"),
            pick_list(
                &QUALITY_OPTIONS[..],
                Some(self.quality),
                DownloadMessage::QualitySelected
            ),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let location_row = row![
            text("Save to:"),
            text_input("Download folder", &self.destination)
                .on_input(DownloadMessage::DestinationChanged)
                .padding(8),
            button("Browse").on_press_maybe(idle.then_some(DownloadMessage::BrowsePressed)),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let actions = row![
            button("Download Now")
                .on_press_maybe(idle.then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20]),
            button("Clear")
                .on_press(DownloadMessage::ClearPressed)
                .padding([10, 20]),
        ]
        .spacing(20);

        column![
            text("YouTube Video Downloader").size(28),
            Space::new().height(Length::Fixed(10.0)),
            text("Step 1: Enter YouTube URL").size(16),
            text_input("Paste a YouTube link...", &self.youtube_url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            text(URL_EXAMPLE).size(12),
            text("Step 2: Choose Options").size(16),
            kind_row,
            quality_row,
            location_row,
            Space::new().height(Length::Fixed(10.0)),
            actions,
            text(&self.status_message).size(14),
            progress_bar(0.0..=1.0, self.download_progress),
            self.info_log(),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }

    fn info_log(&self) -> Element<'_, DownloadMessage> {
        let lines = self
            .info_lines
            .iter()
            .map(|line| text(line).size(13).into());

        scrollable(Column::with_children(lines).spacing(2))
            .height(Length::Fill)
            .into()
    }
}
