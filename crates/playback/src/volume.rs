//! Volume shaping applied to decoded PCM before it is queued for output.
//!
//! One [`VolumePolicy`] with two strategies, picked by configuration:
//!
//! | Policy       | Input range        | Curve                               |
//! |--------------|--------------------|-------------------------------------|
//! | `Percent`    | 0–100 (clamped)    | linear, Q8 fixed point, rounded     |
//! | `Controller` | 0–`full_scale`     | quadratic, capped at `ceiling`      |
//!
//! A level is resolved once per block into a [`Gain`] and then applied to
//! every sample of that block.

use platform::audio_types::VolumePercent;

/// Volume strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VolumePolicy {
    /// Level is a percentage; 100 passes samples through untouched.
    #[default]
    Percent,
    /// Level is a raw analog reading; the response is squared and capped.
    Controller {
        /// Reading that means "fully open".
        full_scale: u16,
        /// Largest amplitude factor ever applied (headroom against clipping).
        ceiling: f32,
    },
}

impl VolumePolicy {
    /// Controller policy for the 12-bit volume pot with 0.6 headroom.
    pub const POTENTIOMETER: Self = Self::Controller {
        full_scale: platform::input::ADC_12BIT_MAX,
        ceiling: 0.6,
    };

    /// Resolve a level into the gain applied to a block.
    pub fn gain(&self, level: u32) -> Gain {
        match *self {
            Self::Percent => {
                let volume = VolumePercent::saturating_from(level);
                match volume.get() {
                    100 => Gain::Unity,
                    0 => Gain::Mute,
                    v => Gain::Fixed(percent_scale(v)),
                }
            }
            Self::Controller { full_scale, ceiling } => {
                let full = u32::from(full_scale);
                if level == 0 || full == 0 {
                    return Gain::Mute;
                }
                #[allow(clippy::cast_precision_loss)] // Safety: both values ≤ u16::MAX, exact in f32
                let x = level.min(full) as f32 / full as f32;
                Gain::Float((x * x).min(ceiling))
            }
        }
    }

    /// Shape `samples` in place for `level`.
    pub fn apply(&self, level: u32, samples: &mut [i16]) {
        self.gain(level).apply(samples);
    }
}

/// Per-block gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gain {
    /// Leave samples untouched.
    Unity,
    /// Zero every sample.
    Mute,
    /// Q8 fixed-point factor below 256, rounded half away from zero.
    Fixed(u16),
    /// Floating factor in `[0, 1]`, truncated toward zero.
    Float(f32),
}

impl Gain {
    /// Apply to `samples` in place.
    pub fn apply(self, samples: &mut [i16]) {
        match self {
            Self::Unity => {}
            Self::Mute => samples.fill(0),
            Self::Fixed(scale) => {
                for s in samples.iter_mut() {
                    *s = scale_fixed(*s, scale);
                }
            }
            Self::Float(factor) => {
                for s in samples.iter_mut() {
                    // `as` saturates and truncates toward zero.
                    #[allow(clippy::cast_possible_truncation)]
                    let scaled = (f32::from(*s) * factor) as i16;
                    *s = scaled;
                }
            }
        }
    }
}

/// `round(v × 256 / 100)` for `v` in 1..=99.
fn percent_scale(v: u8) -> u16 {
    let scaled = u32::from(v).saturating_mul(256).saturating_add(50) / 100;
    u16::try_from(scaled).unwrap_or(u16::MAX)
}

/// `round(s × scale / 256)` with symmetric rounding, saturated to `i16`.
fn scale_fixed(sample: i16, scale: u16) -> i16 {
    // |i16::MIN| × 256 fits comfortably in u32.
    let magnitude = u32::from(sample.unsigned_abs())
        .saturating_mul(u32::from(scale))
        .saturating_add(128)
        >> 8;
    let magnitude = i32::try_from(magnitude).unwrap_or(i32::MAX);
    let signed = if sample < 0 { magnitude.saturating_neg() } else { magnitude };
    i16::try_from(signed).unwrap_or(if signed < 0 { i16::MIN } else { i16::MAX })
}
