//! Base directory layout
//!
//! All shared files live in one base directory. Their names come from the
//! configuration; their shapes are the contract with the front end.

use crate::config::FileNames;
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Empty catalog
pub const DEFAULT_CATALOG: &str = "[]";

/// Checksum that never matches a real directory with files in it
pub const DEFAULT_CATALOG_CHECKSUM: &str = "0";

/// Empty paid queue
pub const DEFAULT_PAID_QUEUE: &str = "[]";

/// Four unset genre slots
pub const DEFAULT_GENRE_FILTER: &str = r#"["null", "null", "null", "null"]"#;

/// No statistics yet
pub const DEFAULT_STATISTICS: &str = "{}";

/// Absolute locations of every shared file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub base_dir: PathBuf,
    pub catalog: PathBuf,
    pub catalog_checksum: PathBuf,
    pub paid_queue: PathBuf,
    pub genre_filter: PathBuf,
    pub now_playing: PathBuf,
    pub play_log: PathBuf,
    pub statistics: PathBuf,
}

/// What `ensure_defaults` had to create
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirstRun {
    /// Files that did not exist and were created with their default content
    pub created: Vec<PathBuf>,

    /// The play log was created now (first run) rather than reopened
    pub play_log_created: bool,
}

impl DataPaths {
    pub fn new(base_dir: impl Into<PathBuf>, names: &FileNames) -> Self {
        let base_dir = base_dir.into();
        Self {
            catalog: base_dir.join(&names.catalog),
            catalog_checksum: base_dir.join(&names.catalog_checksum),
            paid_queue: base_dir.join(&names.paid_queue),
            genre_filter: base_dir.join(&names.genre_filter),
            now_playing: base_dir.join(&names.now_playing),
            play_log: base_dir.join(&names.play_log),
            statistics: base_dir.join(&names.statistics),
            base_dir,
        }
    }

    /// Layout with the default file names
    pub fn with_defaults(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, &FileNames::default())
    }

    /// Create the base directory and any missing file with its empty default
    ///
    /// Existing files are never touched, even if corrupt: readers treat
    /// corrupt content as empty. Failing here is the one unrecoverable
    /// startup condition.
    pub fn ensure_defaults(&self) -> Result<FirstRun> {
        fs::create_dir_all(&self.base_dir).map_err(|e| {
            Error::BaseDir(format!("cannot create {}: {}", self.base_dir.display(), e))
        })?;

        let mut first_run = FirstRun::default();

        let defaults: [(&Path, &str); 7] = [
            (&self.catalog, DEFAULT_CATALOG),
            (&self.catalog_checksum, DEFAULT_CATALOG_CHECKSUM),
            (&self.paid_queue, DEFAULT_PAID_QUEUE),
            (&self.genre_filter, DEFAULT_GENRE_FILTER),
            (&self.now_playing, ""),
            (&self.play_log, ""),
            (&self.statistics, DEFAULT_STATISTICS),
        ];

        for (path, content) in defaults {
            if create_if_missing(path, content)? {
                info!("Created {}", path.display());
                if path == self.play_log.as_path() {
                    first_run.play_log_created = true;
                }
                first_run.created.push(path.to_path_buf());
            }
        }

        Ok(first_run)
    }
}

/// Returns true if the file was created
fn create_if_missing(path: &Path, content: &str) -> Result<bool> {
    // create_new: an external writer creating the same file concurrently wins
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(content.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| Error::BaseDir(format!("cannot write {}: {}", path.display(), e)))?;
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(Error::BaseDir(format!("cannot create {}: {}", path.display(), e))),
    }
}
