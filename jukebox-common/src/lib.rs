//! # Jukebox Common Library
//!
//! Shared code for the jukebox engine and any front end that talks to it
//! through the base directory:
//! - On-disk file contract (paths, default contents)
//! - Atomic file replacement and tolerant reads
//! - Bootstrap configuration (TOML)
//! - Event types (JukeboxEvent) and the broadcast EventBus
//! - Play-log timestamps

pub mod config;
pub mod error;
pub mod events;
pub mod files;
pub mod paths;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, JukeboxEvent, PlaySource};
pub use paths::DataPaths;
