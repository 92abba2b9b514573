//! Append-only play log
//!
//! One line per track started, plus a banner each time the engine starts:
//!
//! ```text
//! 2026-03-14 20:15:02, Jukebox Engine Restarted,
//! 2026-03-14 20:15:03, The Kinks - Waterloo Sunset, Played Random,
//! ```

use crate::Result;
use jukebox_common::{files, time, PlaySource};
use std::path::{Path, PathBuf};

pub const NEW_LOG_BANNER: &str = "Jukebox Engine Started - New Log File Created";
pub const RESTART_BANNER: &str = "Jukebox Engine Restarted";

#[derive(Debug, Clone)]
pub struct PlayLog {
    path: PathBuf,
}

impl PlayLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Startup banner; `new_log` when this run created the file
    pub fn record_startup(&self, new_log: bool) -> Result<()> {
        let banner = if new_log { NEW_LOG_BANNER } else { RESTART_BANNER };
        files::append_line(&self.path, &format!("{}, {},", time::log_timestamp_now(), banner))?;
        Ok(())
    }

    pub fn record_play(&self, artist: &str, title: &str, source: PlaySource) -> Result<()> {
        let line = format_play_line(&time::log_timestamp_now(), artist, title, source);
        files::append_line(&self.path, &line)?;
        Ok(())
    }
}

pub fn format_play_line(timestamp: &str, artist: &str, title: &str, source: PlaySource) -> String {
    format!("{}, {} - {}, Played {},", timestamp, artist, title, source)
}
