//! Track playback through an external media player
//!
//! Playback is blocking: [`Player::play`] returns only after the track ends,
//! fails, times out or is cancelled. The default [`CommandPlayer`] spawns a
//! configured command-line player (ffplay by default) for each track and
//! polls the child process until it exits.

use jukebox_common::config::{PlayerConfig, PATH_PLACEHOLDER};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Why a track did not play to the end
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Audio file is gone
    #[error("Audio file not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// Player process could not be started
    #[error("Failed to start player '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Player exited unsuccessfully
    #[error("Player failed: {status}")]
    PlayerFailed { status: String },

    /// Track exceeded the configured playback timeout
    #[error("Playback timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },

    /// Shutdown requested while the track played
    #[error("Playback interrupted")]
    Interrupted,

    /// Waiting on the player process failed
    #[error("Player I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Plays one track to completion
pub trait Player: Send {
    /// Block until the track ends
    ///
    /// Must return [`PlaybackError::Interrupted`] promptly once `cancel` fires.
    fn play(&mut self, location: &Path, cancel: &CancellationToken) -> Result<(), PlaybackError>;
}

/// Player that runs an external command per track
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl CommandPlayer {
    /// `args` may contain `{path}`; if none does, the path is appended
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: None,
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms.max(1)))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Arguments for one track with the placeholder substituted
    pub fn build_args(&self, location: &Path) -> Vec<OsString> {
        let mut substituted = false;
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg == PATH_PLACEHOLDER {
                    substituted = true;
                    location.as_os_str().to_os_string()
                } else if arg.contains(PATH_PLACEHOLDER) {
                    substituted = true;
                    OsString::from(arg.replace(PATH_PLACEHOLDER, &location.to_string_lossy()))
                } else {
                    OsString::from(arg)
                }
            })
            .collect();
        if !substituted {
            args.push(location.as_os_str().to_os_string());
        }
        args
    }

    fn stop(child: &mut Child) {
        if let Err(e) = child.kill() {
            debug!("Kill failed (player already exited?): {}", e);
        }
        if let Err(e) = child.wait() {
            warn!("Failed to reap player process: {}", e);
        }
    }
}

impl Player for CommandPlayer {
    fn play(&mut self, location: &Path, cancel: &CancellationToken) -> Result<(), PlaybackError> {
        if cancel.is_cancelled() {
            return Err(PlaybackError::Interrupted);
        }
        if !location.is_file() {
            return Err(PlaybackError::FileMissing(location.to_path_buf()));
        }

        let mut child = Command::new(&self.command)
            .args(self.build_args(location))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        debug!(pid = child.id(), file = %location.display(), "Player started");

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return if status.success() {
                    Ok(())
                } else {
                    Err(PlaybackError::PlayerFailed {
                        status: status.to_string(),
                    })
                };
            }

            if cancel.is_cancelled() {
                Self::stop(&mut child);
                return Err(PlaybackError::Interrupted);
            }

            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    Self::stop(&mut child);
                    return Err(PlaybackError::TimedOut { after: timeout });
                }
            }

            std::thread::sleep(self.poll_interval);
        }
    }
}
