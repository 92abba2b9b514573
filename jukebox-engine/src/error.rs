//! Error types for the jukebox engine
//!
//! The scheduler loop is the unit of fault isolation: every variant below
//! except `Init` is logged and absorbed by the loop. `Init` is reported
//! once at startup and stops initialization before the loop starts.

use crate::playback::PlaybackError;
use thiserror::Error;

/// Main error type for the jukebox engine
#[derive(Error, Debug)]
pub enum Error {
    /// No source file produced usable metadata
    #[error("Catalog empty: no audio file yielded valid metadata")]
    CatalogEmpty,

    /// Source directory could not be listed
    #[error("Scan error: {0}")]
    Scan(String),

    /// Paid-queue entry outside the catalog
    #[error("Invalid queue index {index} (catalog has {catalog_len} tracks)")]
    InvalidQueueIndex { index: i64, catalog_len: usize },

    /// Paid-queue file could not be parsed
    #[error("Paid queue corrupt: {0}")]
    QueueCorrupt(String),

    /// Genre filter file has the wrong shape
    #[error("Genre filter malformed: {0}")]
    GenreFilterMalformed(String),

    /// External player could not play a track
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Required files could not be prepared; engine cannot start
    #[error("Initialization failed: {0}")]
    Init(String),

    /// Background task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(String),

    /// Shared file plumbing errors
    #[error(transparent)]
    Common(#[from] jukebox_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
