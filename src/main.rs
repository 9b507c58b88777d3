mod api;
mod app;
mod application;
mod config;
mod domain;
mod ui;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use iced::window;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::api::YtDlpClient;
use crate::application::DownloadCoordinator;
use crate::config::{AppConfig, LogFormat};
use crate::domain::{Checkpoint, MediaKind, MediaRequest, ProgressObserver, QualityPreference};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp")]
    yt_dlp: Option<PathBuf>,

    /// Folder downloads are saved to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Download this URL without opening the window
    #[arg(long)]
    url: Option<String>,

    /// Headless only: save the audio stream as .mp3
    #[arg(long, requires = "url")]
    audio: bool,

    /// Headless only: Highest, 1080p, 720p, 480p or 360p
    #[arg(long, default_value = "Highest", requires = "url")]
    quality: String,
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
}

/// Checkpoints go to the log when there is no window to show them.
struct LogObserver;

impl ProgressObserver for LogObserver {
    fn checkpoint(&self, checkpoint: Checkpoint) {
        match checkpoint {
            Checkpoint::Resolving => info!("Connecting to YouTube..."),
            Checkpoint::Resolved(metadata) => info!(
                "Title: {} | Channel: {} | Duration: {}s | Views: {}",
                metadata.title,
                metadata.author,
                metadata.duration_seconds,
                utils::format_number(metadata.view_count)
            ),
            Checkpoint::Retrieving { stream, .. } => info!("Downloading {}...", stream.describe()),
            Checkpoint::Retrieved(path) => info!("Retrieved {}", path.display()),
        }
    }
}

fn run_headless(config: &AppConfig, args: &Args, url: String) -> Result<()> {
    let request = MediaRequest {
        url,
        kind: if args.audio {
            MediaKind::Audio
        } else {
            MediaKind::Video
        },
        quality: args
            .quality
            .parse::<QualityPreference>()
            .unwrap_or_default(),
        destination: config.download_dir.clone(),
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let coordinator =
        DownloadCoordinator::new(Arc::new(YtDlpClient::new(config.resolver.clone())));

    let result = runtime
        .block_on(coordinator.download(&request, &LogObserver))
        .with_context(|| format!("Download of {} failed", request.url))?;

    info!(
        "Saved \"{}\" as {}{}",
        result.metadata.title,
        result.selected_stream.describe(),
        if result.substituted { " (substituted)" } else { "" }
    );
    println!("{}", result.saved_file_path.display());
    Ok(())
}

fn run_window(config: AppConfig) -> Result<()> {
    let icon_data = include_bytes!("../assets/icon.png");

    let icon = match image::load_from_memory(icon_data) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            window::icon::from_rgba(rgba.into_raw(), width, height).ok()
        }
        Err(e) => {
            warn!("Failed to load window icon: {}", e);
            None
        }
    };

    iced::application(move || app::DownloadApp::new(&config), app::update, app::view)
        .title("Simple YouTube Downloader")
        .window(window::Settings {
            icon,
            size: iced::Size::new(600.0, 560.0),
            min_size: Some(iced::Size::new(500.0, 420.0)),
            ..Default::default()
        })
        .run()
        .context("Window closed with an error")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(path) = &args.yt_dlp {
        config.resolver.binary = path.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.download_dir = dir.clone();
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }

    init_tracing(config.log_format);
    info!("Starting Simple YouTube Downloader...");

    match args.url.clone() {
        Some(url) => run_headless(&config, &args, url),
        None => run_window(config),
    }
}
