//! Shared-file I/O
//!
//! Every file in the base directory is read concurrently by another process
//! (the front end, a display, the engine's own watcher). Writers therefore
//! never truncate a live file: they write a temporary file in the same
//! directory, fsync it, and rename it over the target. Readers see either
//! the old or the new content, never a half-written one.
//!
//! Cross-process there is no lock: the last rename wins.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize `value` as JSON and atomically replace `path` with it
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    write_bytes_atomic(path, &bytes)
}

/// Same as [`write_json_atomic`] but indented, for files people open by hand
pub fn write_json_pretty_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes)
}

/// Atomically replace `path` with `text`
pub fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    // Temp file must live on the same filesystem as the target for rename to be atomic
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

/// Read and parse a JSON file
///
/// Returns `Ok(None)` when the file does not exist. Parse failures are
/// returned as [`Error::Json`]; callers decide whether that is fatal.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a text file, `Ok(None)` when it does not exist
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Append one line to an append-only text file, creating it if needed
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}
