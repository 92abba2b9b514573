//! # Jukebox Engine Library
//!
//! Playback scheduling for a coin-operated jukebox.
//!
//! **Purpose:** Build and cache the track catalog, keep a paid (coin) queue
//! and a rotating random queue, and play one track at a time through an
//! external media player, always serving paid requests first.
//!
//! **Architecture:** The paid queue is a JSON file shared with the front-end
//! process. The scheduler re-reads it before every track; a background
//! watcher only raises advisory notifications when it changes.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod genre;
pub mod now_playing;
pub mod play_log;
pub mod playback;
pub mod queue_store;
pub mod random_queue;
pub mod scheduler;
pub mod statistics;
pub mod watcher;

pub use error::{Error, Result};
