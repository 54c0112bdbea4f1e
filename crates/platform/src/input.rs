//! Analog control input abstraction
//!
//! The volume potentiometer sits on an ADC channel. The playback core only
//! sees an already-quantised reading in `0..=full_scale()`.

/// A single analog control (potentiometer behind an ADC channel).
pub trait AnalogControl {
    /// Error type
    type Error: core::fmt::Debug;

    /// Largest value [`read`](Self::read) can return (4095 for a 12-bit ADC).
    fn full_scale(&self) -> u16;

    /// Take one reading.
    fn read(&mut self) -> impl core::future::Future<Output = Result<u16, Self::Error>>;
}

/// Full-scale reading of the 12-bit ADC the volume pot is wired to.
pub const ADC_12BIT_MAX: u16 = 4095;
