//! Common error types for the jukebox crates

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for jukebox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the engine and front ends
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Atomic replace of a shared file failed
    #[error("Failed to replace {}: {}", .path.display(), .source)]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Base directory or one of its required files could not be created
    #[error("Base directory unusable: {0}")]
    BaseDir(String),
}
