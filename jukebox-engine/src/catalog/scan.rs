//! Source directory listing
//!
//! Lists audio files in the top level of the music directory in the order
//! the filesystem enumerates them. The order is not sorted and may differ
//! between operating systems; catalog indices inherit it.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Absolute, symlink-free form of `music_dir`
///
/// Catalog locations are read by other processes with their own working
/// directory, so they are always built from this path.
pub fn absolute_music_dir(music_dir: &Path) -> Result<PathBuf> {
    if !music_dir.is_dir() {
        return Err(missing_dir(music_dir));
    }
    Ok(fs::canonicalize(music_dir)?)
}

/// List audio files directly inside `music_dir` whose extension is in `extensions`
///
/// `extensions` must already be lowercase without a leading dot. Unreadable
/// entries are logged and skipped.
pub fn list_audio_files(music_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !music_dir.is_dir() {
        return Err(missing_dir(music_dir));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(music_dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_audio_extension(entry.path(), extensions) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                warn!("Error accessing entry: {}", e);
            }
        }
    }

    Ok(files)
}

/// Number of audio files currently in `music_dir` (the catalog checksum)
pub fn count_audio_files(music_dir: &Path, extensions: &[String]) -> Result<u64> {
    Ok(list_audio_files(music_dir, extensions)?.len() as u64)
}

fn missing_dir(music_dir: &Path) -> Error {
    Error::Scan(format!(
        "music directory not found: {}",
        music_dir.display()
    ))
}

fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|x| *x == e)
        })
        .unwrap_or(false)
}
