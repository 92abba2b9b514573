//! Bootstrap configuration and base directory resolution
//!
//! Configuration is a single TOML file (`jukebox.toml`) inside the base
//! directory. Every field has a built-in default, so a missing or broken
//! file never stops the engine: a missing file is written out with the
//! defaults, a broken one is reported and ignored.
//!
//! # Base directory priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `JUKEBOX_BASE_DIR` environment variable
//! 3. OS-dependent data directory
//! 4. `./jukebox_data` (fallback)

use crate::{files, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the base directory
pub const BASE_DIR_ENV: &str = "JUKEBOX_BASE_DIR";

/// Configuration file name inside the base directory
pub const CONFIG_FILE_NAME: &str = "jukebox.toml";

/// Placeholder in `player.args` replaced by the track location
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while the engine runs; restart to pick up edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding the source audio files (relative to the base directory unless absolute)
    pub music_dir: PathBuf,

    /// File extensions counted and scanned as audio (case-insensitive, no dot)
    pub extensions: Vec<String>,

    /// Names of the shared files inside the base directory
    pub files: FileNames,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Request watcher cadence
    pub watcher: WatcherConfig,

    /// External media player
    pub player: PlayerConfig,
}

/// Names of the shared files; front ends rely on these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNames {
    pub catalog: String,
    pub catalog_checksum: String,
    pub paid_queue: String,
    pub genre_filter: String,
    pub now_playing: String,
    pub play_log: String,
    pub statistics: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Diagnostic log file (optional, logs to stderr only if not specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Request watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Polling interval
    pub interval_ms: u64,

    /// How long shutdown waits for the watcher task
    pub shutdown_timeout_ms: u64,
}

/// External media player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Program to run once per track
    pub command: String,

    /// Arguments; `{path}` is replaced by the track location (appended if absent)
    pub args: Vec<String>,

    /// Kill a track that runs longer than this (unset: wait forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// How often the running player is checked for exit, timeout or shutdown
    pub poll_interval_ms: u64,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            music_dir: PathBuf::from("music"),
            extensions: vec!["mp3".to_string()],
            files: FileNames::default(),
            logging: LoggingConfig::default(),
            watcher: WatcherConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            catalog: "MusicMasterSongList.txt".to_string(),
            catalog_checksum: "MusicMasterSongListCheck.txt".to_string(),
            paid_queue: "PaidMusicPlayList.txt".to_string(),
            genre_filter: "GenreFlagsList.txt".to_string(),
            now_playing: "CurrentSongPlaying.txt".to_string(),
            play_log: "log.txt".to_string(),
            statistics: "song_statistics.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "ffplay".to_string(),
            args: ["-nodisp", "-autoexit", "-loglevel", "quiet", PATH_PLACEHOLDER]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: None,
            poll_interval_ms: 200,
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load `jukebox.toml` from the base directory
    ///
    /// - Missing file: write defaults to disk, return defaults
    /// - Unreadable or unparsable file: return defaults
    ///
    /// Nothing is logged here; the binary loads configuration before its
    /// subscriber exists, so callers log the returned status afterwards.
    pub fn load_or_create(base_dir: &Path) -> (Self, ConfigStatus) {
        let path = base_dir.join(CONFIG_FILE_NAME);

        match files::read_text(&path) {
            Ok(Some(text)) => match Self::from_toml_str(&text) {
                Ok(config) => (config, ConfigStatus::Loaded(path)),
                Err(e) => (
                    Self::default(),
                    ConfigStatus::Invalid {
                        path,
                        reason: e.to_string(),
                    },
                ),
            },
            Ok(None) => {
                let config = Self::default();
                let written = toml::to_string_pretty(&config)
                    .map_err(|e| e.to_string())
                    .and_then(|text| {
                        files::write_text_atomic(&path, &text).map_err(|e| e.to_string())
                    });
                let status = match written {
                    Ok(()) => ConfigStatus::Created(path),
                    Err(reason) => ConfigStatus::CreateFailed { path, reason },
                };
                (config, status)
            }
            Err(e) => (
                Self::default(),
                ConfigStatus::Invalid {
                    path,
                    reason: e.to_string(),
                },
            ),
        }
    }

    /// Music directory resolved against the base directory
    pub fn music_dir(&self, base_dir: &Path) -> PathBuf {
        if self.music_dir.is_absolute() {
            self.music_dir.clone()
        } else {
            base_dir.join(&self.music_dir)
        }
    }

    /// Extensions normalized to lowercase without a leading dot
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// How [`TomlConfig::load_or_create`] obtained its configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    /// Parsed from an existing file
    Loaded(PathBuf),
    /// File was missing; defaults written to it
    Created(PathBuf),
    /// File was missing and defaults could not be written
    CreateFailed { path: PathBuf, reason: String },
    /// File unreadable or unparsable; defaults in use
    Invalid { path: PathBuf, reason: String },
}

impl ConfigStatus {
    /// Report the status through tracing
    pub fn log(&self) {
        match self {
            ConfigStatus::Loaded(path) => info!("Loaded configuration from {}", path.display()),
            ConfigStatus::Created(path) => {
                info!("Created default configuration {}", path.display())
            }
            ConfigStatus::CreateFailed { path, reason } => warn!(
                "Failed to write default configuration {}: {}",
                path.display(),
                reason
            ),
            ConfigStatus::Invalid { path, reason } => {
                warn!("{} in {}, using defaults", reason, path.display())
            }
        }
    }
}

/// Resolve the base directory following the priority order above
pub fn resolve_base_dir(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(BASE_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    default_base_dir()
}

/// OS-dependent default base directory
pub fn default_base_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("jukebox"))
        .unwrap_or_else(|| PathBuf::from("./jukebox_data"))
}
