//! Embedded tag extraction
//!
//! Extracts title, artist, album, year, comment (genre tokens) and duration
//! from an audio file using lofty.

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Metadata extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File could not be opened or parsed as audio
    #[error("Failed to read {path}: {reason}")]
    ReadError { path: String, reason: String },
}

/// Raw tags of one file; missing tags are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub comment: Option<String>,
    pub duration: Duration,
}

/// Reads tags from one audio file
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, MetadataError>;
}

/// Tag reader backed by lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, MetadataError> {
        let read_error = |e: lofty::error::LoftyError| MetadataError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let tagged_file = Probe::open(path)
            .map_err(read_error)?
            .read()
            .map_err(read_error)?;

        let duration = tagged_file.properties().duration();

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let tags = match tag {
            Some(tag) => TrackTags {
                title: tag.title().map(|s| s.to_string()),
                artist: tag.artist().map(|s| s.to_string()),
                album: tag.album().map(|s| s.to_string()),
                year: tag.year(),
                comment: tag.comment().map(|s| s.to_string()),
                duration,
            },
            None => TrackTags {
                duration,
                ..TrackTags::default()
            },
        };

        debug!(
            file = %path.display(),
            artist = ?tags.artist,
            title = ?tags.title,
            duration_s = duration.as_secs(),
            "Extracted metadata"
        );

        Ok(tags)
    }
}

/// Display duration as `mm:ss`; minutes are not wrapped at one hour
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}
