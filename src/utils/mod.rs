//! Utility functions.

pub mod random;

#[allow(unused_imports)]
use num_traits::float::Float;

/// Converts a pitch offset in semitones to a frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    (semitones / 12.0).exp2()
}
