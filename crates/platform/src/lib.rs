//! Hardware Abstraction Layer (HAL) for `SoulAudio` DAP
//!
//! Trait-based abstractions for the peripherals the playback core touches,
//! so it can be developed and tested without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware binary)
//!         ↓
//! Playback core (playback crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Abstractions
//!
//! - [`Storage`] / [`File`] - sequential file access with forward seek
//! - [`AudioOutput`] - PCM block pool and transmit queue (I²S / SAI)
//! - [`AnalogControl`] - potentiometer behind an ADC channel
//!
//! Reference implementations: [`block_pool::BlockQueue`] (embassy channels),
//! [`storage_io::IoFile`] (any `embedded-io-async` reader),
//! `storage_local::LocalFileStorage` and `mocks` (host, `std` feature).
//!
//! # Features
//!
//! - `std`: Enable standard library support (host tooling, mocks)
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{AudioOutput, Storage};
//!
//! async fn first_block<S: Storage, O: AudioOutput>(storage: &mut S, out: &mut O) {
//!     let _file = storage.open_file("track.opus").await;
//!     let _block = out.acquire_block().await;
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)] // accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod audio;
pub mod audio_types;
pub mod block_pool;
pub mod config;
pub mod input;
pub mod storage;
pub mod storage_io;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

#[cfg(any(test, feature = "std"))]
pub mod storage_local;

// Re-export main high-level traits
pub use audio::{AudioBlock, AudioConfig, AudioOutput};
pub use audio_types::{ChannelCount, OutOfRangeError, SampleRateHz, VolumePercent};
pub use block_pool::{BlockQueue, BlockQueueError, QueueOutput, TransportState};
pub use input::AnalogControl;
pub use storage::{File, Storage};
