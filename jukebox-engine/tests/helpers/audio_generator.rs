//! Audio Test Fixture Generator
//!
//! Real WAV files so catalog builds exercise actual tag and duration reads.

use std::fs;
use std::path::{Path, PathBuf};

/// Write a silent 16-bit stereo WAV of `duration_seconds`
pub fn generate_test_wav(path: &Path, duration_seconds: f64) -> PathBuf {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (duration_seconds * 44100.0) as usize;
    for _ in 0..frames {
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    path.to_path_buf()
}

/// Create `dir/music` holding one short WAV per name
pub fn generate_music_dir(dir: &Path, names: &[&str]) -> PathBuf {
    let music = dir.join("music");
    fs::create_dir_all(&music).unwrap();
    for name in names {
        generate_test_wav(&music.join(format!("{}.wav", name)), 2.0);
    }
    music
}
