use std::path::PathBuf;

use super::model::{StreamDescriptor, VideoMetadata};

/// Points in a download where the shell is told what is going on.
#[derive(Debug, Clone)]
pub enum Checkpoint {
    Resolving,
    Resolved(VideoMetadata),
    Retrieving {
        stream: StreamDescriptor,
        substituted: bool,
    },
    Retrieved(PathBuf),
}

/// Display-only hooks. Implementations must return immediately.
pub trait ProgressObserver: Send + Sync {
    fn checkpoint(&self, checkpoint: Checkpoint);

    /// Transfer progress from 0.0 to 1.0.
    fn transfer(&self, _progress: f32) {}
}
