pub mod download_coordinator;
pub mod stream_selector;

pub use download_coordinator::{DownloadCoordinator, DownloadEvent};
