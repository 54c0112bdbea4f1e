//! Ogg/Opus playback core: demultiplexing, header verification and the
//! decode-render loop that feeds the audio output pool.
//!
//! ```text
//! ControlChannel ──▶ PlaybackSession ──▶ DemuxState / OggPageCursor ──▶ Storage
//!                          │
//!                          ├──▶ OpusDecoder (external)
//!                          └──▶ AudioOutput (block pool)
//! ```
//!
//! All buffers are fixed-size and owned by their caller; the crate never
//! allocates. Logging goes through defmt (`defmt` feature, hardware) or
//! tracing (`tracing` feature, host).
#![cfg_attr(not(any(test, feature = "std")), no_std)]
// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod decoder;
pub mod demux;
pub mod engine;
pub mod error;
pub mod ogg;
pub mod opus_header;
pub mod session;
pub mod volume;

pub use config::{ConfigError, PlaybackConfig};
pub use control::{try_send_control, ControlChannel, ControlError, ControlMessage, VolumeFilter};
pub use decoder::OpusDecoder;
pub use demux::{ContinuationPolicy, DemuxState, PacketOutcome};
pub use engine::{PlaybackEngine, PlaybackState, StateError, TrackOutcome};
pub use error::{FormatError, PlaybackError};
pub use opus_header::{verify_headers, OpusStreamInfo};
pub use session::{PlaybackSession, SessionStats, Step};
pub use volume::{Gain, VolumePolicy};
