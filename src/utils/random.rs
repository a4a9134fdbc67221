//! Fast 32-bit linear congruential pseudo random number generator.
//!
//! The state is process-wide and lock free, so the sample & hold LFO can
//! draw values from the audio thread without allocating or blocking.

// Based on MIT-licensed code (c) 2012 by Olivier Gillet (ol.gillet@gmail.com)

use core::sync::atomic::{AtomicU32, Ordering};

static RNG_STATE: AtomicU32 = AtomicU32::new(0x21);

#[inline]
pub fn seed(seed: u32) {
    RNG_STATE.store(seed, Ordering::Relaxed);
}

#[inline]
pub fn get_word() -> u32 {
    let next = RNG_STATE
        .load(Ordering::Relaxed)
        .wrapping_mul(1664525)
        .wrapping_add(1013904223);
    RNG_STATE.store(next, Ordering::Relaxed);

    next
}

/// Uniform value in `[0, 1)`.
#[inline]
pub fn get_float() -> f32 {
    (get_word() >> 8) as f32 / (1 << 24) as f32
}
