//! Host presence detected through a marker file the embedding host creates.

use std::path::{Path, PathBuf};

use trailcast_platform::PresenceSignal;

#[derive(Debug, Clone, Default)]
pub struct MarkerFilePresence {
    marker: Option<PathBuf>,
}

impl MarkerFilePresence {
    pub fn new(marker: Option<PathBuf>) -> Self {
        Self { marker }
    }
}

impl PresenceSignal for MarkerFilePresence {
    fn is_present(&self) -> bool {
        self.marker.as_deref().is_some_and(Path::exists)
    }
}
