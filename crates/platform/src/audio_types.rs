//! Audio domain newtypes for compile-time safety.
//!
//! - `VolumePercent`: clamps 0–100 for the percentage volume scale
//! - `SampleRateHz`: validates 8000–768000 Hz range
//! - `ChannelCount`: mono or stereo only

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} outside {}..={}", self.value, self.min, self.max)
    }
}

// ── VolumePercent ────────────────────────────────────────────────────────────

/// Volume as a percentage, clamped to 0–100.
///
/// Wraps a `u8` with the invariant `0 <= value <= 100`.
/// Construct with [`VolumePercent::new`] (clamping) or
/// [`VolumePercent::try_new`] (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumePercent(u8);

impl VolumePercent {
    /// Full volume.
    pub const MAX: Self = Self(100);

    /// Silence.
    pub const MUTE: Self = Self(0);

    /// Create a `VolumePercent`, clamping values above 100 to 100.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Create from a wider integer (a control-channel value), clamping to 100.
    #[must_use]
    pub fn saturating_from(value: u32) -> Self {
        Self(u8::try_from(value.min(100)).unwrap_or(100))
    }

    /// Create a `VolumePercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the inner volume value (0–100).
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Sample rate in Hz, validated to the range the output path supports.
///
/// Valid range: 8000–768000 Hz (8 kHz to 768 kHz PCM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz (telephony).
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 768000 Hz (DAC PCM max).
    pub const MAX_HZ: u32 = 768_000;

    /// Opus always decodes at 48 kHz.
    pub const OPUS: Self = Self(48_000);

    /// Create a `SampleRateHz`, returning an error if out of 8000–768000 Hz.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 768000`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if hz < Self::MIN_HZ || hz > Self::MAX_HZ {
            Err(OutOfRangeError {
                value: hz,
                min: Self::MIN_HZ,
                max: Self::MAX_HZ,
            })
        } else {
            Ok(Self(hz))
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

// ── ChannelCount ─────────────────────────────────────────────────────────────

/// Number of interleaved output channels: 1 (mono) or 2 (stereo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelCount(u8);

impl ChannelCount {
    /// Single channel.
    pub const MONO: Self = Self(1);

    /// Two interleaved channels (L, R).
    pub const STEREO: Self = Self(2);

    /// Create a `ChannelCount`, rejecting anything but 1 or 2.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] for 0 or more than 2 channels.
    pub fn new(channels: u8) -> Result<Self, OutOfRangeError> {
        if channels == 0 || channels > 2 {
            Err(OutOfRangeError {
                value: u32::from(channels),
                min: 1,
                max: 2,
            })
        } else {
            Ok(Self(channels))
        }
    }

    /// Return the channel count.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Return the channel count as a `usize` for sample arithmetic.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}
