//! Scripted Player
//!
//! Fake player that records every location, completes instantly unless
//! told otherwise, and can stop the engine after a number of plays.

use jukebox_engine::playback::{PlaybackError, Player};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Hook = Box<dyn FnMut(usize, &Path) + Send>;

/// What the Nth play (1-based) does instead of completing
pub enum Script {
    /// Return a player failure
    Fail,
    /// Cancel the engine and report an interrupted track
    Interrupt,
    /// Block until the engine is cancelled
    BlockUntilCancelled,
}

pub struct ScriptedPlayer {
    played: Arc<Mutex<Vec<PathBuf>>>,
    stop_after: Option<usize>,
    scripts: HashMap<usize, Script>,
    during_play: Option<Hook>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self {
            played: Arc::new(Mutex::new(Vec::new())),
            stop_after: None,
            scripts: HashMap::new(),
            during_play: None,
        }
    }

    /// Cancel the engine once `plays` tracks have completed
    pub fn stop_after(mut self, plays: usize) -> Self {
        self.stop_after = Some(plays);
        self
    }

    pub fn script(mut self, play: usize, script: Script) -> Self {
        self.scripts.insert(play, script);
        self
    }

    /// Run `hook(play_number, location)` while a track "plays"
    pub fn during_play(mut self, hook: impl FnMut(usize, &Path) + Send + 'static) -> Self {
        self.during_play = Some(Box::new(hook));
        self
    }

    /// Shared list of played locations
    pub fn played(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        self.played.clone()
    }
}

impl Player for ScriptedPlayer {
    fn play(&mut self, location: &Path, cancel: &CancellationToken) -> Result<(), PlaybackError> {
        let play_number = {
            let mut played = self.played.lock().unwrap();
            played.push(location.to_path_buf());
            played.len()
        };

        if let Some(hook) = self.during_play.as_mut() {
            hook(play_number, location);
        }

        match self.scripts.remove(&play_number) {
            Some(Script::Fail) => {
                return Err(PlaybackError::PlayerFailed {
                    status: "exit status: 1".to_string(),
                })
            }
            Some(Script::Interrupt) => {
                cancel.cancel();
                return Err(PlaybackError::Interrupted);
            }
            Some(Script::BlockUntilCancelled) => {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                return Err(PlaybackError::Interrupted);
            }
            None => {}
        }

        if self.stop_after == Some(play_number) {
            cancel.cancel();
        }
        Ok(())
    }
}

/// Locations as plain strings for assertions
pub fn locations(played: &Arc<Mutex<Vec<PathBuf>>>) -> Vec<String> {
    played
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect()
}
