//! Paid queue file access
//!
//! The paid queue is a JSON array of catalog indices, oldest first. The
//! front-end appends to it; the engine removes entries after playing them.
//! There is no cross-process lock: every write replaces the file atomically
//! so a reader never sees a partial array, and the engine always re-reads
//! the file immediately before modifying it. A front-end append that lands
//! between that read and the rename can still be lost; the window is a few
//! milliseconds once per track.
//!
//! Within the process, a mutex serializes the scheduler's read-modify-write
//! cycle against the watcher's reads.

use crate::{Error, Result};
use jukebox_common::files;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

/// Outcome of removing a played entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// First occurrence removed
    Removed,
    /// Entry no longer present (the front-end rewrote the queue)
    NotPresent,
}

#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock carries no broken state
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Strict read: missing file is an empty queue, unparsable content is `QueueCorrupt`
    pub fn try_read(&self) -> Result<Vec<i64>> {
        let _guard = self.guard();
        self.read_unlocked()
    }

    /// Read the queue, treating corrupt content as empty
    ///
    /// The corrupt file is left in place; the front-end's next write repairs it.
    pub fn read_paid_queue(&self) -> Vec<i64> {
        match self.try_read() {
            Ok(queue) => queue,
            Err(e) => {
                error!("{}; treating paid queue as empty", e);
                Vec::new()
            }
        }
    }

    /// Replace the queue atomically
    pub fn write_paid_queue(&self, queue: &[i64]) -> Result<()> {
        let _guard = self.guard();
        files::write_json_atomic(&self.path, queue)?;
        Ok(())
    }

    /// Append an index at the tail (front-end side of the protocol)
    pub fn append(&self, index: i64) -> Result<()> {
        let _guard = self.guard();
        let mut queue = self.read_unlocked()?;
        queue.push(index);
        files::write_json_atomic(&self.path, &queue)?;
        Ok(())
    }

    /// Remove the first occurrence of `index` from the current file contents
    ///
    /// The file is re-read under the lock so entries the front-end appended
    /// while the track played are kept. A corrupt file is left untouched.
    pub fn remove_played(&self, index: i64) -> Result<Removal> {
        let _guard = self.guard();
        let mut queue = self.read_unlocked()?;

        match queue.iter().position(|&i| i == index) {
            Some(pos) => {
                queue.remove(pos);
                files::write_json_atomic(&self.path, &queue)?;
                debug!(index, remaining = queue.len(), "Removed played entry");
                Ok(Removal::Removed)
            }
            None => Ok(Removal::NotPresent),
        }
    }

    fn read_unlocked(&self) -> Result<Vec<i64>> {
        let text = match files::read_text(&self.path)? {
            Some(text) => text,
            None => return Ok(Vec::new()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<Vec<i64>>(&text).map_err(|e| {
            Error::QueueCorrupt(format!("{}: {}", self.path.display(), e))
        })
    }
}
