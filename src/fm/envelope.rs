//! Multi-segment envelope generator.
//!
//! The classic constant-time design might cause differences in behavior from
//! the original DX-series envelopes, in particular when jumping to the last
//! segment before having reached the sustain phase.
//!
//! A couple of quirks from the DX-series' operator envelopes are implemented,
//! namely:
//! - vaguely logarithmic shape for ascending segments.
//! - direct jump above a threshold for ascending segments.
//! - specific logic and rates for plateaus.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

#[allow(unused_imports)]
use num_traits::float::Float;

use super::dx_units::{
    operator_envelope_increment, operator_level, pitch_envelope_increment, pitch_envelope_level,
};
use super::patch;

/// Level below which ascending operator segments jump instantly.
pub const ASCENDING_SEGMENT_FLOOR: f32 = 6.7;

#[derive(Debug, Clone)]
pub struct Envelope<const NUM_STAGES: usize = 4, const RESHAPE_ASCENDING_SEGMENTS: bool = false>
{
    pub stage: usize,
    pub phase: f32,
    /// Value snapshotted on a gate edge. `None` after a regular stage
    /// change: the segment then starts from the previous stage's level.
    pub start: Option<f32>,

    increment: [f32; NUM_STAGES],
    level: [f32; NUM_STAGES],
    scale: f32,
}

impl<const NUM_STAGES: usize, const RESHAPE_ASCENDING_SEGMENTS: bool>
    Envelope<NUM_STAGES, RESHAPE_ASCENDING_SEGMENTS>
{
    pub fn new(scale: f32) -> Self {
        let mut envelope = Self {
            stage: 0,
            phase: 0.0,
            start: None,

            increment: [0.0; NUM_STAGES],
            level: [0.0; NUM_STAGES],
            scale: 0.0,
        };
        envelope.init(scale);

        envelope
    }

    #[inline]
    pub fn init(&mut self, scale: f32) {
        self.scale = scale;
        self.stage = NUM_STAGES - 1;
        self.phase = 1.0;
        self.start = Some(0.0);

        for i in 0..NUM_STAGES {
            self.increment[i] = 0.001;
            self.level[i] = 1.0 / (1 << i) as f32;
        }

        self.level[NUM_STAGES - 1] = 0.0;
    }

    // Directly copy the variables.
    pub fn set(&mut self, increment: &[f32; NUM_STAGES], level: &[f32; NUM_STAGES]) {
        self.increment.copy_from_slice(increment);
        self.level.copy_from_slice(level);
    }

    #[inline]
    pub fn increment(&self, stage: usize) -> f32 {
        self.increment[stage]
    }

    #[inline]
    pub fn level(&self, stage: usize) -> f32 {
        self.level[stage]
    }

    #[inline]
    pub fn render_default(&mut self, gate: bool) -> f32 {
        self.render(gate, 1.0, 1.0, 1.0)
    }

    /// Advances the envelope by `rate` samples and returns its value.
    #[inline]
    pub fn render(&mut self, gate: bool, rate: f32, ad_scale: f32, release_scale: f32) -> f32 {
        if gate {
            if self.stage == NUM_STAGES - 1 {
                self.start = Some(self.current_value());
                self.stage = 0;
                self.phase = 0.0;
            }
        } else if self.stage != NUM_STAGES - 1 {
            self.start = Some(self.current_value());
            self.stage = NUM_STAGES - 1;
            self.phase = 0.0;
        }

        let scale = if self.stage == NUM_STAGES - 1 {
            release_scale
        } else {
            ad_scale
        };
        self.phase += self.increment[self.stage] * rate * scale;

        if self.phase >= 1.0 {
            if self.stage >= NUM_STAGES - 2 {
                self.phase = 1.0;
            } else {
                self.phase = 0.0;
                self.stage += 1;
            }
            self.start = None;
        }

        self.current_value()
    }

    #[inline]
    pub fn current_value(&self) -> f32 {
        self.value(self.stage, self.phase, self.start)
    }

    #[inline]
    pub fn value(&self, stage: usize, mut phase: f32, start_level: Option<f32>) -> f32 {
        let mut from =
            start_level.unwrap_or(self.level[(stage + NUM_STAGES - 1) % NUM_STAGES]);
        let mut to = self.level[stage];

        if RESHAPE_ASCENDING_SEGMENTS && from < to {
            from = f32::max(ASCENDING_SEGMENT_FLOOR, from);
            to = f32::max(ASCENDING_SEGMENT_FLOOR, to);
            phase *= (2.5 - phase) * 0.666667;
        }

        phase * (to - from) + from
    }
}

impl<const NUM_STAGES: usize, const RESHAPE_ASCENDING_SEGMENTS: bool> Default
    for Envelope<NUM_STAGES, RESHAPE_ASCENDING_SEGMENTS>
{
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Envelope of an operator, in units of 1/8th of the 0-127 "TL" scale.
#[derive(Debug, Clone, Default)]
pub struct OperatorEnvelope(pub Envelope<4, true>);

impl OperatorEnvelope {
    pub fn new(scale: f32) -> Self {
        Self(Envelope::new(scale))
    }

    pub fn set(&mut self, params: &patch::Envelope, global_level: u8) {
        let envelope = &mut self.0;

        // Configure levels.
        for (target, level) in envelope.level.iter_mut().zip(params.level) {
            let mut level_scaled = operator_level(level) as i32;
            level_scaled = (level_scaled & !1) + global_level as i32 - 133;
            *target = 0.125
                * (if level_scaled < 1 {
                    0.5
                } else {
                    level_scaled as f32
                });
        }

        // Configure increments.
        for i in 0..4 {
            let mut increment = operator_envelope_increment(params.rate[i]);
            let mut from = envelope.level[(i + 3) % 4];
            let mut to = envelope.level[i];

            if from == to {
                // Quirk: for plateaux, the increment is scaled.
                increment *= 0.6;
                if i == 0 && params.level[i] == 0 {
                    // Quirk: the attack plateau is faster.
                    increment *= 20.0;
                }
            } else if from < to {
                from = f32::max(ASCENDING_SEGMENT_FLOOR, from);
                to = f32::max(ASCENDING_SEGMENT_FLOOR, to);
                if from == to {
                    // Quirk: because of the jump, the attack might disappear.
                    increment = 1.0;
                } else {
                    // Quirk: because of the weird shape, the rate is adjusted.
                    increment *= 7.2 / (to - from);
                }
            } else {
                increment *= 1.0 / (from - to);
            }

            envelope.increment[i] = increment * envelope.scale;
        }
    }
}

/// Envelope of the voice pitch, in octaves.
#[derive(Debug, Clone, Default)]
pub struct PitchEnvelope(pub Envelope<4, false>);

impl PitchEnvelope {
    pub fn new(scale: f32) -> Self {
        Self(Envelope::new(scale))
    }

    pub fn set(&mut self, params: &patch::Envelope) {
        let envelope = &mut self.0;

        for (target, level) in envelope.level.iter_mut().zip(params.level) {
            *target = pitch_envelope_level(level);
        }

        for (i, rate) in params.rate.iter().enumerate() {
            let from = envelope.level[(i + 3) % 4];
            let to = envelope.level[i];
            let mut increment = pitch_envelope_increment(*rate);

            if from != to {
                increment *= 1.0 / f32::abs(from - to);
            } else if i != 3 {
                increment = 0.2;
            }

            envelope.increment[i] = increment * envelope.scale;
        }
    }
}
