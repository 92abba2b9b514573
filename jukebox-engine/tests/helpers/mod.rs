//! Test Helper Utilities
//!
//! Shared utilities for testing jukebox-engine

#![allow(dead_code)]

pub mod audio_generator;
pub mod scripted_player;

// Each test binary uses a different subset
#[allow(unused_imports)]
pub use audio_generator::{generate_music_dir, generate_test_wav};
#[allow(unused_imports)]
pub use scripted_player::ScriptedPlayer;
