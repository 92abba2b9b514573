//! Event types for the jukebox event system
//!
//! Events are advisory. They feed displays and logs; no code path that
//! keeps music playing depends on an event being delivered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Where a track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaySource {
    /// Coin-triggered request from the paid queue
    Paid,
    /// Ambient rotation
    Random,
}

impl PlaySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaySource::Paid => "Paid",
            PlaySource::Random => "Random",
        }
    }
}

impl fmt::Display for PlaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Jukebox event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JukeboxEvent {
    /// Engine finished initialization and is about to play
    EngineStarted {
        catalog_size: usize,
        random_queue_size: usize,
        timestamp: DateTime<Utc>,
    },

    /// A track is about to start (now-playing pointer already written)
    TrackStarted {
        index: usize,
        artist: String,
        title: String,
        source: PlaySource,
        timestamp: DateTime<Utc>,
    },

    /// A track ended; `completed` is false when the player failed
    TrackFinished {
        index: usize,
        source: PlaySource,
        completed: bool,
        timestamp: DateTime<Utc>,
    },

    /// Paid queue file changed on disk (watcher notification)
    PaidQueueChanged {
        queued: usize,
        added: usize,
        timestamp: DateTime<Utc>,
    },

    /// Now-playing file changed on disk (watcher notification)
    NowPlayingChanged {
        location: String,
        timestamp: DateTime<Utc>,
    },

    /// A paid-queue entry pointed outside the catalog and was dropped
    InvalidQueueEntry {
        index: i64,
        catalog_size: usize,
        timestamp: DateTime<Utc>,
    },

    /// Random rotation is empty and no paid request is pending
    Exhausted {
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast channel shared by the scheduler, the watcher and any listener
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JukeboxEvent>,
}

impl EventBus {
    /// Creates a new EventBus; `capacity` events are buffered before old ones are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
