//! Opus decoder seam.
//!
//! Decoding math lives outside this crate. On hardware the implementation
//! wraps libopus (fixed-point build, one stereo decoder state of roughly
//! 26 KB in AXI SRAM); on the host, tests supply scripted decoders. The
//! session only sequences calls: one packet in, up to `max_frames` frames of
//! interleaved `i16` out.
//!
//! Decoding always runs at 48 kHz, the rate Opus is defined at, so the output
//! path never resamples.

/// Stateful Opus packet decoder.
pub trait OpusDecoder {
    /// Error type produced by this decoder.
    type Error: core::fmt::Debug;

    /// Decode one packet into `pcm` as interleaved samples.
    ///
    /// `pcm` holds at least `max_frames × channels` samples. Returns the
    /// number of frames (samples per channel) written.
    ///
    /// # Errors
    ///
    /// Returns `Err(Self::Error)` on a corrupt packet or a packet that would
    /// decode to more than `max_frames` frames.
    fn decode(
        &mut self,
        packet: &[u8],
        pcm: &mut [i16],
        max_frames: usize,
    ) -> Result<usize, Self::Error>;

    /// Drop all inter-packet state so the next track starts clean.
    fn reset(&mut self);
}

/// Largest frame count a single Opus packet can decode to: 120 ms at 48 kHz.
pub const MAX_FRAMES_PER_PACKET: usize = 5_760;
