#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod fm;
pub mod processor;
pub mod utils;

pub use error::Error;

/// Sample rate the DX envelope and LFO rates are calibrated for.
pub const NATIVE_SAMPLE_RATE: f32 = 44100.0;

/// Sample rate context for DSP calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRate {
    /// Sample rate in Hz
    pub sample_rate_hz: f32,
    /// Reciprocal of sample rate (1.0 / sample_rate_hz) for fast multiplication
    pub inv_sr: f32,
    /// Normalized frequency of A0 (55 Hz) for MIDI note conversion
    pub a0_normalized: f32,
}

impl SampleRate {
    /// Create a new sample rate context.
    pub fn new(sample_rate_hz: f32) -> Self {
        let inv_sr = 1.0 / sample_rate_hz;
        let a0_normalized = 55.0 * inv_sr;
        Self {
            sample_rate_hz,
            inv_sr,
            a0_normalized,
        }
    }

    /// Ratio between the legacy native rate and this rate, used to scale
    /// envelope increments.
    #[inline]
    pub fn envelope_scale(&self) -> f32 {
        NATIVE_SAMPLE_RATE * self.inv_sr
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::new(48000.0)
    }
}
