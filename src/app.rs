use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use iced::Task;
use tracing::info;

use crate::api::YtDlpClient;
use crate::application::{DownloadCoordinator, DownloadEvent};
use crate::config::AppConfig;
use crate::domain::{Checkpoint, DownloadPhase, MediaKind};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::{format_duration, format_number};

const SEPARATOR_WIDTH: usize = 50;

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
}

impl DownloadApp {
    pub fn new(config: &AppConfig) -> (Self, Task<Message>) {
        let client = YtDlpClient::new(config.resolver.clone());
        let coordinator = DownloadCoordinator::new(Arc::new(client.clone()));
        let view = DownloadView::new(config.download_dir.display().to_string());

        let check = Task::perform(
            async move { client.check_availability().await },
            Message::ResolverChecked,
        );

        (Self { view, coordinator }, check)
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    ResolverChecked(bool),
    FolderSelected(Option<PathBuf>),
    Download(DownloadEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::DownloadPressed if !app.view.is_downloading => {
                    return start_download(app);
                }
                DownloadMessage::BrowsePressed => {
                    let start = PathBuf::from(app.view.destination.trim());
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&start)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderSelected,
                    );
                }
                _ => {}
            }
        }
        Message::ResolverChecked(available) => {
            if !available {
                app.view.status_message =
                    "yt-dlp was not found. Install it or set YTDLP_PATH.".to_string();
            }
        }
        Message::FolderSelected(Some(folder)) => {
            app.view.destination = folder.display().to_string();
        }
        Message::FolderSelected(None) => {}
        Message::Download(event) => apply_event(&mut app.view, event),
    }
    Task::none()
}

fn start_download(app: &mut DownloadApp) -> Task<Message> {
    let Some(request) = app.view.build_request() else {
        app.view.status_message = "Please enter a YouTube URL".to_string();
        return Task::none();
    };

    info!(
        "Starting {} download ({}) for {}",
        request.kind, request.quality, request.url
    );

    let stream = app.coordinator.download_stream(request.clone());
    app.view.active_request = Some(request);
    app.view.is_downloading = true;
    app.view.download_progress = 0.0;
    app.view.push_info("=".repeat(SEPARATOR_WIDTH));
    app.view.push_info("Starting download...");

    Task::stream(stream.map(Message::Download))
}

/// Reflect one orchestrator event in the view.
fn apply_event(view: &mut DownloadView, event: DownloadEvent) {
    match event {
        DownloadEvent::Checkpoint(Checkpoint::Resolving) => {
            view.phase = DownloadPhase::Resolving;
            view.status_message = "Connecting to YouTube...".to_string();
        }
        DownloadEvent::Checkpoint(Checkpoint::Resolved(metadata)) => {
            view.push_info(format!("Title: {}", metadata.title));
            view.push_info(format!("Channel: {}", metadata.author));
            view.push_info(format!(
                "Duration: {} ({} seconds)",
                format_duration(metadata.duration_seconds),
                metadata.duration_seconds
            ));
            view.push_info(format!("Views: {}", format_number(metadata.view_count)));
            view.push_info("-".repeat(SEPARATOR_WIDTH));
        }
        DownloadEvent::Checkpoint(Checkpoint::Retrieving {
            stream,
            substituted,
        }) => {
            view.phase = DownloadPhase::Downloading;
            let (kind, quality) = match &view.active_request {
                Some(request) => (request.kind, request.quality.to_string()),
                None => (view.kind, view.quality.to_string()),
            };
            if substituted {
                view.push_info(format!(
                    "Quality {} not available, using {} instead",
                    quality,
                    stream.describe()
                ));
            }
            view.status_message = match kind {
                MediaKind::Audio => "Downloading audio...".to_string(),
                MediaKind::Video => format!("Downloading video ({})...", quality),
            };
            view.push_info(format!("Downloading {}...", stream.describe()));
        }
        DownloadEvent::Checkpoint(Checkpoint::Retrieved(_)) => {
            view.status_message = "Download complete, finalizing...".to_string();
        }
        DownloadEvent::Progress(progress) => {
            view.download_progress = progress;
            if view.phase == DownloadPhase::Downloading {
                view.status_message = format!("Downloading: {:.1}%", progress * 100.0);
            }
        }
        DownloadEvent::Finished(result) => {
            view.is_downloading = false;
            view.active_request = None;
            view.download_progress = 0.0;
            match result {
                Ok(result) => {
                    view.phase = DownloadPhase::Completed;
                    let file_name = result
                        .saved_file_path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let label = match result.selected_stream.kind {
                        MediaKind::Audio => "Audio",
                        MediaKind::Video => "Video",
                    };
                    view.push_info(format!("✅ {} saved as: {}", label, file_name));
                    view.status_message = format!(
                        "Download completed successfully! Saved to: {}",
                        result.saved_file_path.display()
                    );
                }
                Err(e) => {
                    view.phase = DownloadPhase::Failed;
                    view.push_info(format!("❌ {}", e));
                    view.status_message = format!("Download failed: {}", e);
                }
            }
        }
    }
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
