//! Now-playing pointer file
//!
//! Holds the location of the track currently playing, for the front-end
//! display. Written atomically before each track starts.

use crate::Result;
use jukebox_common::files;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct NowPlaying {
    path: PathBuf,
}

impl NowPlaying {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, location: &str) -> Result<()> {
        files::write_text_atomic(&self.path, location)?;
        Ok(())
    }

    /// Current pointer; empty when missing
    pub fn read(&self) -> Result<String> {
        Ok(files::read_text(&self.path)?.unwrap_or_default())
    }
}
