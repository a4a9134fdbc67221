//! Various "magic" conversion functions for DX7 patch data.
//!
//! Several of these reproduce integer arithmetic of the original hardware and
//! must keep their shift/mask semantics: downstream code compares the integer
//! codes for equality.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

#![allow(clippy::excessive_precision)]

#[allow(unused_imports)]
use num_traits::float::Float;

use super::patch::{FrequencyMode, KeyboardScaling, Operator};
use crate::utils::semitones_to_ratio;

/// Frequency of an operator, resolved from its mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OscillatorMode {
    /// Multiplier applied to the note frequency.
    RatioOfFundamental(f32),
    /// Absolute frequency in Hz.
    FixedFrequencyHz(f32),
}

impl OscillatorMode {
    /// Normalized frequency (cycles per sample) for a note frequency `f0`,
    /// itself normalized.
    #[inline]
    pub fn frequency(&self, f0: f32, one_hz: f32) -> f32 {
        match *self {
            Self::RatioOfFundamental(ratio) => ratio * f0,
            Self::FixedFrequencyHz(hz) => hz * one_hz,
        }
    }
}

impl Default for OscillatorMode {
    fn default() -> Self {
        Self::RatioOfFundamental(1.0)
    }
}

// Convert an operator (envelope) level from 0-99 to the complement of the
// "TL" value.
//   0 =   0  (TL = 127)
//  20 =  48  (TL =  79)
//  50 =  78  (TL =  49)
//  99 = 127  (TL =   0)
#[inline]
pub fn operator_level(level: u8) -> u8 {
    let mut tlc = level as u32;

    if level < 20 {
        tlc = if tlc < 15 {
            (tlc * (36 - tlc)) >> 3
        } else {
            27 + tlc
        };
    } else {
        tlc += 28;
    }

    tlc as u8
}

// Convert an envelope level from 0-99 to an octave shift.
//  0 = -4 octave
// 18 = -1 octave
// 50 =  0
// 82 = +1 octave
// 99 = +4 octave
#[inline]
pub fn pitch_envelope_level(level: u8) -> f32 {
    let l = (level as f32 - 50.0) / 32.0;
    let tail = f32::max(f32::abs(l + 0.02) - 1.0, 0.0);

    l * (1.0 + tail * tail * 5.3056)
}

// Convert an operator envelope rate from 0-99 to a frequency.
#[inline]
pub fn operator_envelope_increment(rate: u8) -> f32 {
    let rate_scaled = (rate as i32 * 41) >> 6;
    let mantissa = 4 + (rate_scaled & 3);
    let exponent = 2 + (rate_scaled >> 2);

    (mantissa << exponent) as f32 / (1 << 24) as f32
}

// Convert a pitch envelope rate from 0-99 to a frequency.
#[inline]
pub fn pitch_envelope_increment(rate: u8) -> f32 {
    let r = rate as f32 * 0.01;

    (1.0 + 192.0 * r * (r * r * r * r + 0.3333)) / (21.3 * 44100.0)
}

const MIN_LFO_FREQUENCY: f32 = 0.005865;

// Convert an LFO rate from 0-99 to a frequency.
#[inline]
pub fn lfo_frequency(rate: u8) -> f32 {
    let mut rate_scaled = if rate == 0 {
        1
    } else {
        (rate as u32 * 165) >> 6
    };
    rate_scaled *= if rate_scaled < 160 {
        11
    } else {
        11 + ((rate_scaled - 160) >> 4)
    };

    rate_scaled as f32 * MIN_LFO_FREQUENCY
}

// Convert an LFO delay from 0-99 to the two increments (before and after the
// ramp starts).
#[inline]
pub fn lfo_delay(delay: u8) -> [f32; 2] {
    if delay == 0 {
        [100000.0; 2]
    } else {
        let mut d = (99 - delay) as i32;
        d = (16 + (d & 15)) << (1 + (d >> 4));
        [
            d as f32 * MIN_LFO_FREQUENCY,
            (i32::max(0x80, d & 0xFF80)) as f32 * MIN_LFO_FREQUENCY,
        ]
    }
}

// Pre-process the velocity to easily compute the velocity scaling.
#[inline]
pub fn normalize_velocity(velocity: f32) -> f32 {
    16.0 * (velocity.max(0.0).cbrt() - 0.918)
}

// MIDI note to envelope increment ratio.
#[inline]
pub fn rate_scaling(note: f32, rate_scaling: u8) -> f32 {
    (rate_scaling as f32 * (note * 0.333 - 7.0) * 0.03125).exp2()
}

// Operator amplitude modulation sensitivity (0-3).
#[inline]
pub fn amp_mod_sensitivity(amp_mod_sensitivity: u8) -> f32 {
    LUT_AMP_MOD_SENSITIVITY[usize::min(amp_mod_sensitivity as usize, 3)]
}

// Pitch modulation sensitivity (0-7).
#[inline]
pub fn pitch_mod_sensitivity(pitch_mod_sensitivity: u8) -> f32 {
    LUT_PITCH_MOD_SENSITIVITY[usize::min(pitch_mod_sensitivity as usize, 7)]
}

// Keyboard tracking to TL adjustment.
//
// Curves 0 and 3 are linear, 1 and 2 exponential; 0 and 1 lower the level
// away from the break point, 2 and 3 raise it.
#[inline]
pub fn keyboard_scaling(note: f32, ks: &KeyboardScaling) -> f32 {
    let x = note - ks.break_point as f32 - 15.0;
    let (curve, depth) = if x > 0.0 {
        (ks.right_curve, ks.right_depth)
    } else {
        (ks.left_curve, ks.left_depth)
    };

    let mut t = f32::abs(x);

    if curve == 1 || curve == 2 {
        t = f32::min(t * 0.010467, 1.0);
        t = t * t * t;
        t *= 96.0;
    }
    if curve < 2 {
        t = -t;
    }

    t * depth as f32 * 0.02677
}

#[inline]
pub fn frequency_ratio(op: &Operator) -> OscillatorMode {
    let detune_offset = (op.detune as f32 - 7.0) * 0.015;

    match op.mode {
        FrequencyMode::Ratio => {
            let fine = if op.fine != 0 {
                1.0 + 0.01 * op.fine as f32
            } else {
                1.0
            };
            let base = LUT_COARSE[usize::min(op.coarse as usize, 31)] + detune_offset;
            OscillatorMode::RatioOfFundamental(semitones_to_ratio(base) * fine)
        }
        FrequencyMode::Fixed => {
            let base = ((op.coarse & 3) as i32 * 100 + op.fine as i32) as f32 * 0.39864;
            OscillatorMode::FixedFrequencyHz(semitones_to_ratio(base + detune_offset))
        }
    }
}

const LUT_COARSE: [f32; 32] = [
    -12.000000, 0.000000, 12.000000, 19.019550, 24.000000, 27.863137, 31.019550, 33.688259,
    36.000000, 38.039100, 39.863137, 41.513180, 43.019550, 44.405276, 45.688259, 46.882687,
    48.000000, 49.049554, 50.039100, 50.975130, 51.863137, 52.707809, 53.513180, 54.282743,
    55.019550, 55.726274, 56.405276, 57.058650, 57.688259, 58.295772, 58.882687, 59.450356,
];

const LUT_AMP_MOD_SENSITIVITY: [f32; 4] = [0.0, 0.2588, 0.4274, 1.0];

const LUT_PITCH_MOD_SENSITIVITY: [f32; 8] = [
    0.0, 0.0781250, 0.1562500, 0.2578125, 0.4296875, 0.7187500, 1.1953125, 2.0,
];
