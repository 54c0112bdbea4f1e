//! Names and paths shared by firmware and host tooling.
//!
//! Reference these rather than hardcoding them.

/// Environment variable naming the host directory that stands in for the SD card.
pub const MUSIC_PATH_ENV: &str = "MUSIC_PATH";

/// File extension of playable tracks.
pub const TRACK_EXTENSION: &str = "opus";
