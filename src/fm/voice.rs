//! DX7 voice.
//!
//! A voice owns the runtime state of one note: operators, their envelopes,
//! the pitch envelope and the feedback memory. Modulation from the LFO is
//! computed outside and passed in with the other per-block parameters.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use alloc::boxed::Box;
use alloc::vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use super::algorithms::{Algorithms, Bus, Modulators};
use super::dx_units::{
    amp_mod_sensitivity, frequency_ratio, keyboard_scaling, normalize_velocity, operator_level,
    rate_scaling, OscillatorMode,
};
use super::envelope::{OperatorEnvelope, PitchEnvelope};
use super::operator::{ModulationSource, Operator};
use super::patch::Patch;
use crate::utils::semitones_to_ratio;
use crate::SampleRate;

/// Six operator voice using the 32 algorithms of the DX7.
pub type Dx7Voice = Voice<6, 32>;

/// Four operator voice using the 8 algorithms of the DX100/DX21/DX27.
pub type Dx100Voice = Voice<4, 8>;

/// Control values, sampled once per block.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoiceParameters {
    pub gate: bool,
    pub note: f32,
    pub velocity: f32,
    pub brightness: f32,
    pub envelope_control: f32,
    /// Pitch modulation in octaves.
    pub pitch_mod: f32,
    pub amp_mod: f32,
}

impl VoiceParameters {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            gate: false,
            note: 48.0,
            velocity: 0.5,
            brightness: 0.5,
            envelope_control: 0.5,
            pitch_mod: 0.0,
            amp_mod: 0.0,
        }
    }
}

/// Scale applied to the attack and decay rates by the envelope control.
#[inline]
pub fn attack_decay_scale(envelope_control: f32) -> f32 {
    ((0.5 - envelope_control) * 8.0).exp2()
}

/// Scale applied to the release rate by the envelope control.
#[inline]
pub fn release_scale(envelope_control: f32) -> f32 {
    (-f32::abs(envelope_control - 0.3) * 8.0).exp2()
}

#[derive(Debug, Clone)]
pub struct Voice<const NUM_OPERATORS: usize, const NUM_ALGORITHMS: usize> {
    algorithms: &'static Algorithms<NUM_OPERATORS, NUM_ALGORITHMS>,
    algorithm: usize,
    modulators: Modulators,

    one_hz: f32,
    a0: f32,

    gate: bool,

    operator: [Operator; NUM_OPERATORS],
    operator_envelope: [OperatorEnvelope; NUM_OPERATORS],
    pitch_envelope: PitchEnvelope,

    normalized_velocity: f32,
    note: f32,

    ratios: [OscillatorMode; NUM_OPERATORS],
    level_headroom: [f32; NUM_OPERATORS],
    level: [f32; NUM_OPERATORS],

    feedback_state: [f32; 2],

    patch: Option<Patch>,

    dirty: bool,

    scratch_buffer: Box<[f32]>,
    modulation_buffer: Box<[f32]>,
}

impl Voice<6, 32> {
    pub fn dx7(block_size: usize) -> Self {
        Self::new(Algorithms::dx7(), block_size)
    }
}

impl Voice<4, 8> {
    pub fn dx100(block_size: usize) -> Self {
        Self::new(Algorithms::dx100(), block_size)
    }
}

impl<const NUM_OPERATORS: usize, const NUM_ALGORITHMS: usize>
    Voice<NUM_OPERATORS, NUM_ALGORITHMS>
{
    /// Creates a voice rendering blocks of at most `block_size` samples.
    pub fn new(
        algorithms: &'static Algorithms<NUM_OPERATORS, NUM_ALGORITHMS>,
        block_size: usize,
    ) -> Self {
        let mut voice = Self {
            algorithms,
            algorithm: 0,
            modulators: Modulators::default(),

            one_hz: 0.0,
            a0: 0.0,

            gate: false,

            operator: [Operator::new(); NUM_OPERATORS],
            operator_envelope: core::array::from_fn(|_| OperatorEnvelope::default()),
            pitch_envelope: PitchEnvelope::default(),

            normalized_velocity: 0.0,
            note: 0.0,

            ratios: [OscillatorMode::default(); NUM_OPERATORS],
            level_headroom: [0.0; NUM_OPERATORS],
            level: [0.0; NUM_OPERATORS],

            feedback_state: [0.0; 2],

            patch: None,

            dirty: false,

            scratch_buffer: vec![0.0; block_size].into_boxed_slice(),
            modulation_buffer: vec![0.0; block_size].into_boxed_slice(),
        };
        voice.init(SampleRate::default());

        voice
    }

    #[inline]
    pub fn init(&mut self, sample_rate: SampleRate) {
        self.one_hz = sample_rate.inv_sr;
        self.a0 = sample_rate.a0_normalized;

        let envelope_scale = sample_rate.envelope_scale();

        for (operator, operator_envelope) in self
            .operator
            .iter_mut()
            .zip(self.operator_envelope.iter_mut())
        {
            operator.reset();
            operator_envelope.0.init(envelope_scale);
        }

        self.pitch_envelope.0.init(envelope_scale);

        self.feedback_state = [0.0; 2];

        self.gate = false;
        self.note = 48.0;
        self.normalized_velocity = 10.0;

        self.dirty = true;
    }

    /// Swaps the patch. The derived constants are recomputed by the next
    /// [`Voice::setup`], so a block is never rendered with a mix of two
    /// patches.
    #[inline]
    pub fn set_patch(&mut self, patch: Patch) {
        self.patch = Some(patch);
        self.dirty = true;
    }

    #[inline]
    pub fn unload_patch(&mut self) {
        self.patch = None;
        self.dirty = true;
    }

    #[inline]
    pub fn patch(&self) -> Option<&Patch> {
        self.patch.as_ref()
    }

    // Pre-compute everything that can be pre-computed once a patch is loaded:
    // - envelope constants
    // - frequency ratios
    // - algorithm and its modulators
    #[inline]
    pub fn setup(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let Some(patch) = self.patch.as_ref() else {
            return false;
        };

        self.pitch_envelope.set(&patch.pitch_envelope);

        for (i, op) in patch.op.iter().take(NUM_OPERATORS).enumerate() {
            let level = operator_level(op.level);
            self.operator_envelope[i].set(&op.envelope, level);

            // The level increase caused by keyboard scaling plus velocity
            // scaling should not exceed this number - otherwise it would be
            // equivalent to have an operator with a level above 99.
            self.level_headroom[i] = (127 - level) as f32;

            self.ratios[i] = frequency_ratio(op);
        }

        self.algorithm = patch.algorithm as usize % NUM_ALGORITHMS;
        self.modulators = self.algorithms.for_patch(patch.algorithm).modulators();
        self.dirty = false;

        log::trace!(
            "Voice setup: algorithm {}, modulators {:#08b}",
            self.algorithm + 1,
            self.modulators.bits()
        );

        true
    }

    #[inline]
    pub fn modulators(&self) -> Modulators {
        self.modulators
    }

    #[inline]
    pub fn op_level(&self, i: usize) -> f32 {
        self.level[i]
    }

    #[inline]
    pub fn operator(&self, i: usize) -> &Operator {
        &self.operator[i]
    }

    #[inline]
    pub fn operator_envelope(&self, i: usize) -> &OperatorEnvelope {
        &self.operator_envelope[i]
    }

    #[inline]
    pub fn pitch_envelope(&self) -> &PitchEnvelope {
        &self.pitch_envelope
    }

    /// Renders one block into `out`, which is overwritten. Blocks longer than
    /// the size given to [`Voice::new`] are truncated to it. Without a patch,
    /// `out` is left untouched.
    #[inline]
    pub fn render(&mut self, parameters: &VoiceParameters, out: &mut [f32]) {
        self.setup();

        let Some(patch) = self.patch.as_ref() else {
            return;
        };

        let size = usize::min(out.len(), self.scratch_buffer.len());
        let out = &mut out[..size];
        out.fill(0.0);

        if size == 0 {
            return;
        }

        let envelope_rate = size as f32;
        let ad_scale = attack_decay_scale(parameters.envelope_control);
        let r_scale = release_scale(parameters.envelope_control);

        // Apply LFO and pitch envelope modulations.
        let pitch_envelope =
            self.pitch_envelope
                .0
                .render(parameters.gate, envelope_rate, ad_scale, r_scale);
        let pitch_mod = pitch_envelope + parameters.pitch_mod;
        let f0 = self.a0 * 0.25 * semitones_to_ratio(parameters.note - 9.0 + pitch_mod * 12.0);

        // Sample the note and velocity (used for scaling) only when a trigger
        // is received.
        let note_on = parameters.gate && !self.gate;
        self.gate = parameters.gate;

        if note_on {
            self.normalized_velocity = normalize_velocity(parameters.velocity);
            self.note = parameters.note;

            // Reset operator phase if the patch requires it.
            if patch.reset_phase {
                for operator in self.operator.iter_mut() {
                    operator.phase = 0.0;
                }
            }
        }

        // Compute frequencies and amplitudes.
        let mut f = [0.0; NUM_OPERATORS];
        let mut a = [0.0; NUM_OPERATORS];

        for (i, op) in patch.op.iter().take(NUM_OPERATORS).enumerate() {
            f[i] = self.ratios[i].frequency(f0, self.one_hz);

            let rate_scaling = rate_scaling(self.note, op.rate_scaling);
            let mut level = self.operator_envelope[i].0.render(
                parameters.gate,
                envelope_rate * rate_scaling,
                ad_scale,
                r_scale,
            );

            let kb_scaling = keyboard_scaling(self.note, &op.keyboard_scaling);
            let velocity_scaling = self.normalized_velocity * op.velocity_sensitivity as f32;
            let brightness = if self.modulators.contains(i) {
                (parameters.brightness - 0.5) * 32.0
            } else {
                0.0
            };

            level += 0.125
                * f32::min(
                    kb_scaling + velocity_scaling + brightness,
                    self.level_headroom[i],
                );

            self.level[i] = level;

            let sensitivity = amp_mod_sensitivity(op.amp_mod_sensitivity);
            let log_level_mod = sensitivity * parameters.amp_mod - 1.0;
            let level_mod = 1.0 - (6.4 * log_level_mod).exp2();
            a[i] = (-14.0 + level * level_mod).exp2();
        }

        let algorithm = self.algorithms.for_patch(self.algorithm as u8);
        let scratch = &mut self.scratch_buffer[..size];
        let modulation = &mut self.modulation_buffer[..size];

        for (i, call) in algorithm.stacks() {
            let Some(render_fn) = call.render_fn else {
                continue;
            };

            if call.source == Some(ModulationSource::External) {
                match call.input {
                    Bus::Output => modulation.copy_from_slice(&*out),
                    Bus::Scratch => modulation.copy_from_slice(&*scratch),
                }
            }

            let destination: &mut [f32] = match call.output {
                Bus::Output => &mut *out,
                Bus::Scratch => &mut *scratch,
            };

            render_fn(
                &mut self.operator[i..],
                &f[i..],
                &a[i..],
                &mut self.feedback_state,
                patch.feedback,
                &*modulation,
                destination,
            );
        }
    }
}
