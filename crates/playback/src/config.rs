//! Playback session configuration.
//!
//! # Block sizing
//!
//! One output block holds one decode call's worst case:
//!
//! ```text
//! frame_capacity × channels = 5760 × 2 = 11 520 samples = 23 040 bytes
//! ```
//!
//! With the default pool of two blocks that is 46 KB of AXI SRAM, enough for
//! 240 ms of audio in flight at 48 kHz.

use embassy_time::Duration;
use platform::audio_types::{ChannelCount, SampleRateHz};
use platform::AudioConfig;

use crate::decoder::MAX_FRAMES_PER_PACKET;
use crate::demux::ContinuationPolicy;
use crate::volume::VolumePolicy;

/// Errors from [`PlaybackConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Output channel count other than 1 or 2.
    InvalidChannels(u8),
    /// Output sample rate outside the supported range.
    InvalidSampleRate(u32),
    /// A decode call must be allowed to produce at least one frame.
    ZeroFrameCapacity,
    /// Controller policy with a full-scale reading of 0.
    ZeroAdcRange,
    /// Controller ceiling outside `(0, 1]`.
    CeilingOutOfRange(f32),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidChannels(n) => write!(f, "unsupported output channel count {n}"),
            Self::InvalidSampleRate(hz) => write!(f, "unsupported sample rate {hz} Hz"),
            Self::ZeroFrameCapacity => f.write_str("frame capacity must be non-zero"),
            Self::ZeroAdcRange => f.write_str("controller full scale must be non-zero"),
            Self::CeilingOutOfRange(c) => write!(f, "volume ceiling {c} outside (0, 1]"),
        }
    }
}

/// Parameters of a [`PlaybackSession`](crate::session::PlaybackSession).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Interleaved output channels.
    pub channels: u8,
    /// Maximum frames one decode call may produce.
    pub frame_capacity: usize,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Silent blocks queued before the transport starts.
    pub prefill_blocks: usize,
    /// How long a streaming iteration waits for a control message.
    pub poll_timeout: Duration,
    /// Volume level in force before the first `SetVolume`.
    pub initial_volume: u32,
    /// Volume shaping strategy.
    pub volume_policy: VolumePolicy,
    /// Cross-page packet handling.
    pub continuation: ContinuationPolicy,
}

impl PlaybackConfig {
    /// Reference configuration: stereo 48 kHz, 120 ms decode frames, two
    /// pre-fill blocks, percentage volume at 100.
    pub const fn stereo_48khz() -> Self {
        Self {
            channels: 2,
            frame_capacity: MAX_FRAMES_PER_PACKET,
            sample_rate: 48_000,
            prefill_blocks: 2,
            poll_timeout: Duration::from_millis(5),
            initial_volume: 100,
            volume_policy: VolumePolicy::Percent,
            continuation: ContinuationPolicy::Lenient,
        }
    }

    /// As [`stereo_48khz`](Self::stereo_48khz), volume driven by the 12-bit
    /// pot. Starts silent until the first reading arrives.
    pub const fn with_potentiometer() -> Self {
        Self {
            initial_volume: 0,
            volume_policy: VolumePolicy::POTENTIOMETER,
            ..Self::stereo_48khz()
        }
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ChannelCount::new(self.channels).map_err(|_| ConfigError::InvalidChannels(self.channels))?;
        SampleRateHz::new(self.sample_rate)
            .map_err(|_| ConfigError::InvalidSampleRate(self.sample_rate))?;
        if self.frame_capacity == 0 {
            return Err(ConfigError::ZeroFrameCapacity);
        }
        if let VolumePolicy::Controller { full_scale, ceiling } = self.volume_policy {
            if full_scale == 0 {
                return Err(ConfigError::ZeroAdcRange);
            }
            if !(ceiling > 0.0 && ceiling <= 1.0) {
                return Err(ConfigError::CeilingOutOfRange(ceiling));
            }
        }
        Ok(())
    }

    /// Interleaved samples in one full output block.
    pub fn block_samples(&self) -> usize {
        self.frame_capacity.saturating_mul(usize::from(self.channels))
    }

    /// Output driver configuration matching this session.
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: 16,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::stereo_48khz()
    }
}
