//! Track catalog
//!
//! The catalog is the ordered list of every playable track. A track's index
//! is its position in the list and is the only identifier the paid queue
//! and the random queue use, so a catalog is never reordered once built.
//!
//! The catalog is persisted as a JSON array together with a checksum file
//! holding the number of audio files in the source directory at build
//! time. At startup the persisted catalog is reused when the current file
//! count matches the checksum; otherwise it is rebuilt from the files.
//!
//! The checksum is a raw count: replacing one file with another between
//! runs keeps the count and therefore keeps the old catalog.

pub mod metadata;
pub mod scan;

use crate::{Error, Result};
use jukebox_common::files;
use metadata::{format_duration, LoftyTagReader, TagReader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One catalog entry
///
/// Field names on disk follow the shared file format read by the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    /// Position in the catalog
    #[serde(rename = "number")]
    pub index: usize,
    /// Path of the audio file
    pub location: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    /// Free-text comment tag; carries genre tokens
    #[serde(rename = "comment")]
    pub genre_tag: String,
    /// `mm:ss`
    pub duration: String,
}

/// Ordered, immutable track list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    /// Build from tracks, renumbering so that `index` equals position
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(i, mut t)| {
                t.index = i;
                t
            })
            .collect();
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Look up a queue entry; negative or out-of-range values yield `None`
    pub fn lookup(&self, index: i64) -> Option<&Track> {
        usize::try_from(index).ok().and_then(|i| self.tracks.get(i))
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Sorted, deduplicated whitespace-separated tokens of every comment tag
    pub fn distinct_genres(&self) -> Vec<String> {
        self.tracks
            .iter()
            .flat_map(|t| t.genre_tag.split_whitespace())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Parse persisted catalog JSON, rejecting arrays whose numbering is not 0..N
    fn from_persisted(tracks: Vec<Track>) -> Option<Self> {
        if tracks.iter().enumerate().all(|(i, t)| t.index == i) {
            Some(Self { tracks })
        } else {
            None
        }
    }
}

/// Result of checking the persisted catalog against the source directory
#[derive(Debug)]
pub enum Freshness {
    /// Persisted catalog can be reused as is
    Fresh(Catalog),
    /// Catalog must be rebuilt
    Stale(StaleReason),
}

/// Why a persisted catalog was not reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// Checksum file missing or unparsable
    NoChecksum,
    /// File count changed since the last build
    CountChanged { stored: u64, current: u64 },
    /// Catalog file missing, unparsable or misnumbered
    CatalogUnreadable,
    /// Catalog file holds no tracks
    CatalogEmpty,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleReason::NoChecksum => write!(f, "no usable checksum"),
            StaleReason::CountChanged { stored, current } => {
                write!(f, "file count changed ({} -> {})", stored, current)
            }
            StaleReason::CatalogUnreadable => write!(f, "catalog file unreadable"),
            StaleReason::CatalogEmpty => write!(f, "catalog file empty"),
        }
    }
}

/// Builds, persists and reloads the catalog
pub struct CatalogStore {
    music_dir: PathBuf,
    extensions: Vec<String>,
    catalog_path: PathBuf,
    checksum_path: PathBuf,
    reader: Box<dyn TagReader>,
}

impl CatalogStore {
    /// Store reading tags with lofty
    pub fn new(
        music_dir: impl Into<PathBuf>,
        extensions: Vec<String>,
        catalog_path: impl Into<PathBuf>,
        checksum_path: impl Into<PathBuf>,
    ) -> Self {
        Self::with_reader(
            music_dir,
            extensions,
            catalog_path,
            checksum_path,
            Box::new(LoftyTagReader),
        )
    }

    pub fn with_reader(
        music_dir: impl Into<PathBuf>,
        extensions: Vec<String>,
        catalog_path: impl Into<PathBuf>,
        checksum_path: impl Into<PathBuf>,
        reader: Box<dyn TagReader>,
    ) -> Self {
        Self {
            music_dir: music_dir.into(),
            extensions,
            catalog_path: catalog_path.into(),
            checksum_path: checksum_path.into(),
            reader,
        }
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Scan the source directory, read every file's tags and persist the result
    ///
    /// Files whose tags cannot be read are logged and skipped. The catalog is
    /// written before the checksum so that a crash between the two writes
    /// leaves a checksum that forces a rebuild next time.
    pub fn build(&self) -> Result<Catalog> {
        let root = scan::absolute_music_dir(&self.music_dir)?;
        let files = scan::list_audio_files(&root, &self.extensions)?;
        info!(
            "Building catalog from {} files in {}",
            files.len(),
            root.display()
        );

        let mut tracks = Vec::with_capacity(files.len());
        let mut skipped = 0usize;

        for path in &files {
            match self.reader.read_tags(path) {
                Ok(tags) => {
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    tracks.push(Track {
                        index: tracks.len(),
                        location: path.to_string_lossy().to_string(),
                        title: tags.title.filter(|t| !t.is_empty()).unwrap_or(stem),
                        artist: tags.artist.unwrap_or_default(),
                        album: tags.album.unwrap_or_default(),
                        year: tags.year.map(|y| y.to_string()).unwrap_or_default(),
                        genre_tag: tags.comment.unwrap_or_default(),
                        duration: format_duration(tags.duration),
                    });
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }

        if tracks.is_empty() {
            return Err(Error::CatalogEmpty);
        }

        let catalog = Catalog { tracks };

        files::write_json_pretty_atomic(&self.catalog_path, catalog.tracks())?;
        files::write_json_atomic(&self.checksum_path, &(files.len() as u64))?;

        info!(
            "Catalog built: {} tracks ({} skipped)",
            catalog.len(),
            skipped
        );

        Ok(catalog)
    }

    /// Reuse the persisted catalog if the source file count still matches
    ///
    /// Never reads per-file metadata. Errors only when the source directory
    /// cannot be listed.
    pub fn load_if_fresh(&self) -> Result<Freshness> {
        let current = scan::count_audio_files(&self.music_dir, &self.extensions)?;

        let stored = match files::read_json::<u64>(&self.checksum_path) {
            Ok(Some(n)) => n,
            Ok(None) => return Ok(Freshness::Stale(StaleReason::NoChecksum)),
            Err(e) => {
                warn!("Catalog checksum unreadable: {}", e);
                return Ok(Freshness::Stale(StaleReason::NoChecksum));
            }
        };

        if stored != current {
            return Ok(Freshness::Stale(StaleReason::CountChanged { stored, current }));
        }

        let tracks = match files::read_json::<Vec<Track>>(&self.catalog_path) {
            Ok(Some(tracks)) => tracks,
            Ok(None) => return Ok(Freshness::Stale(StaleReason::CatalogUnreadable)),
            Err(e) => {
                warn!("Catalog file unreadable: {}", e);
                return Ok(Freshness::Stale(StaleReason::CatalogUnreadable));
            }
        };

        if tracks.is_empty() {
            return Ok(Freshness::Stale(StaleReason::CatalogEmpty));
        }

        match Catalog::from_persisted(tracks) {
            Some(catalog) => {
                debug!("Persisted catalog is fresh ({} files)", current);
                Ok(Freshness::Fresh(catalog))
            }
            None => {
                warn!("Catalog file numbering does not match positions");
                Ok(Freshness::Stale(StaleReason::CatalogUnreadable))
            }
        }
    }

    /// Load the persisted catalog when fresh, otherwise rebuild it
    pub fn load_or_build(&self) -> Result<Catalog> {
        match self.load_if_fresh() {
            Ok(Freshness::Fresh(catalog)) => {
                info!("Loaded catalog: {} tracks", catalog.len());
                Ok(catalog)
            }
            Ok(Freshness::Stale(reason)) => {
                info!("Catalog stale ({}), rebuilding", reason);
                self.build()
            }
            Err(e) => Err(e),
        }
    }
}
