//! Audio output transport abstraction
//!
//! The output transport owns a small, fixed pool of PCM blocks. Producers
//! acquire a block (waiting while every block is in flight), fill it and
//! submit it; the transmit side releases blocks back to the pool once they
//! have been clocked out. Waiting in [`AudioOutput::acquire_block`] is the
//! pipeline's backpressure: decoding runs exactly as fast as the output
//! clock consumes.

/// A fixed-capacity block of interleaved signed 16-bit PCM.
///
/// The backing memory is `'static` (a `StaticCell` or linker-placed buffer on
/// hardware, a leaked allocation on the host). `len` marks how many leading
/// samples are valid; the transport treats the rest as silence.
pub struct AudioBlock {
    samples: &'static mut [i16],
    len: usize,
}

impl AudioBlock {
    /// Wrap a buffer as an empty block.
    pub fn new(samples: &'static mut [i16]) -> Self {
        Self { samples, len: 0 }
    }

    /// Total capacity in samples.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of valid samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when no sample is valid.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark the first `len` samples as valid (clamped to capacity).
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.samples.len());
    }

    /// Whole backing buffer, for a decoder to write into.
    pub fn buffer_mut(&mut self) -> &mut [i16] {
        &mut *self.samples
    }

    /// Valid samples.
    pub fn samples(&self) -> &[i16] {
        self.samples.get(..self.len).unwrap_or(&[])
    }

    /// Valid samples, mutable.
    pub fn samples_mut(&mut self) -> &mut [i16] {
        let len = self.len;
        self.samples.get_mut(..len).unwrap_or(&mut [])
    }

    /// Zero the whole buffer and mark it as full of silence.
    pub fn fill_silence(&mut self) {
        self.samples.fill(0);
        self.len = self.samples.len();
    }

    /// Give back the backing buffer.
    pub fn into_buffer(self) -> &'static mut [i16] {
        self.samples
    }
}

impl core::fmt::Debug for AudioBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AudioBlock")
            .field("len", &self.len)
            .field("capacity", &self.samples.len())
            .finish()
    }
}

/// Output transport trait (I²S / SAI with a block queue).
pub trait AudioOutput {
    /// Error type
    type Error: core::fmt::Debug;

    /// Number of blocks in the transport's pool.
    fn pool_size(&self) -> usize;

    /// Take a free block, waiting until the transmit side releases one.
    fn acquire_block(
        &mut self,
    ) -> impl core::future::Future<Output = Result<AudioBlock, Self::Error>>;

    /// Take a free block if one is available right now.
    fn try_acquire_block(&mut self) -> Result<Option<AudioBlock>, Self::Error>;

    /// Queue a filled block for transmission.
    fn submit(
        &mut self,
        block: AudioBlock,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Start clocking queued blocks out.
    fn start(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Let queued blocks play out, then stop.
    fn drain(&mut self) -> impl core::future::Future<Output = Result<(), Self::Error>>;
}

/// Audio configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u8,
    /// Bit depth
    pub bit_depth: u8,
}

impl AudioConfig {
    /// Check the configuration against what the output path supports.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`](crate::audio_types::OutOfRangeError) for a
    /// sample rate outside [`SampleRateHz`](crate::audio_types::SampleRateHz)
    /// or a channel count other than 1 or 2.
    pub fn validate(&self) -> Result<(), crate::audio_types::OutOfRangeError> {
        crate::audio_types::SampleRateHz::new(self.sample_rate)?;
        crate::audio_types::ChannelCount::new(self.channels)?;
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            bit_depth: 16,
        }
    }
}
