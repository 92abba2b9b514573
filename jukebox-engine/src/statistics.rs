//! Per-song play statistics
//!
//! Persisted as a JSON object keyed by catalog index. Each entry keeps a
//! play count, the time of the last play and up to the last
//! [`MAX_HISTORY`] plays. The map keeps at most [`MAX_ENTRIES`] songs; when
//! it grows past that, only the most played songs survive.

use crate::catalog::Track;
use crate::Result;
use jukebox_common::{files, time, PlaySource};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Plays remembered per song
pub const MAX_HISTORY: usize = 100;

/// Songs kept in the statistics map
pub const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    pub timestamp: String,
    /// `paid` or `random`
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongStats {
    pub title: String,
    pub artist: String,
    pub play_count: u64,
    pub last_played: Option<String>,
    pub play_history: Vec<PlayRecord>,
}

/// Entry of a most-played listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSong {
    pub index: usize,
    pub title: String,
    pub artist: String,
    pub play_count: u64,
    pub last_played: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongStatistics {
    songs: BTreeMap<usize, SongStats>,
}

impl SongStatistics {
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SongStats> {
        self.songs.get(&index)
    }

    pub fn total_plays(&self) -> u64 {
        self.songs.values().map(|s| s.play_count).sum()
    }

    /// Count one play of `track` at `timestamp`
    pub fn record(&mut self, track: &Track, source: PlaySource, timestamp: &str) {
        let entry = self.songs.entry(track.index).or_insert_with(|| SongStats {
            title: track.title.clone(),
            artist: track.artist.clone(),
            ..SongStats::default()
        });

        entry.play_count += 1;
        entry.last_played = Some(timestamp.to_string());
        entry.play_history.push(PlayRecord {
            timestamp: timestamp.to_string(),
            kind: source.as_str().to_ascii_lowercase(),
        });
        if entry.play_history.len() > MAX_HISTORY {
            let excess = entry.play_history.len() - MAX_HISTORY;
            entry.play_history.drain(..excess);
        }

        if self.songs.len() > MAX_ENTRIES {
            self.prune(MAX_ENTRIES);
        }
    }

    /// Most played first; ties go to the most recently played, then lowest index
    pub fn top_songs(&self, limit: usize) -> Vec<TopSong> {
        self.ranked()
            .into_iter()
            .take(limit)
            .map(|(index, s)| TopSong {
                index,
                title: s.title.clone(),
                artist: s.artist.clone(),
                play_count: s.play_count,
                last_played: s.last_played.clone(),
            })
            .collect()
    }

    fn ranked(&self) -> Vec<(usize, &SongStats)> {
        let mut ranked: Vec<(usize, &SongStats)> =
            self.songs.iter().map(|(i, s)| (*i, s)).collect();
        ranked.sort_by_key(|(index, s)| {
            (Reverse(s.play_count), Reverse(s.last_played.clone()), *index)
        });
        ranked
    }

    fn prune(&mut self, limit: usize) {
        let keep: Vec<usize> = self
            .ranked()
            .into_iter()
            .take(limit)
            .map(|(index, _)| index)
            .collect();
        let before = self.songs.len();
        self.songs.retain(|index, _| keep.contains(index));
        warn!(
            "Pruned statistics from {} to {} songs",
            before,
            self.songs.len()
        );
    }
}

/// Statistics bound to their file
#[derive(Debug)]
pub struct StatisticsStore {
    path: PathBuf,
    stats: SongStatistics,
}

impl StatisticsStore {
    /// Load from disk; missing or corrupt files start empty
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stats = match files::read_json::<SongStatistics>(&path) {
            Ok(Some(stats)) => stats,
            Ok(None) => {
                info!("No statistics file, starting fresh");
                SongStatistics::default()
            }
            Err(e) => {
                warn!("Statistics unreadable: {}, starting fresh", e);
                SongStatistics::default()
            }
        };
        Self { path, stats }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> &SongStatistics {
        &self.stats
    }

    /// Record a play and persist
    pub fn record_play(&mut self, track: &Track, source: PlaySource) -> Result<()> {
        self.stats
            .record(track, source, &time::log_timestamp_now());
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        files::write_json_pretty_atomic(&self.path, &self.stats)?;
        Ok(())
    }
}
