pub mod error;
pub mod model;
pub mod progress;

pub use error::DownloadError;
pub use model::{
    DownloadPhase, DownloadResult, MediaKind, MediaRequest, QualityPreference, ResolvedMedia,
    StreamDescriptor, StreamSource, VideoMetadata, AUDIO_EXTENSION,
};
pub use progress::{Checkpoint, ProgressObserver};
