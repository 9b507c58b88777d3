use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Invalid YouTube URL. Please check the URL and try again.")]
    InvalidUrl,

    #[error("Video is unavailable (private, deleted, or age-restricted)")]
    VideoUnavailable,

    #[error("No suitable stream available")]
    NoSuitableStream,

    #[error("An error occurred: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Unknown(e.to_string())
    }
}
