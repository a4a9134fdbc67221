//! DX7-compatible LFO.
//!
//! One LFO is shared by all operators of a voice. It is stepped once per
//! block and its output is handed to the voice as k-rate pitch and amplitude
//! modulation.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use core::f32::consts::PI;

#[allow(unused_imports)]
use num_traits::float::Float;

use super::dx_units::{lfo_delay, lfo_frequency, pitch_mod_sensitivity};
use super::patch::ModulationParameters;
use crate::utils::random;
use crate::SampleRate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Triangle,

    RampDown,
    RampUp,
    Square,
    Sine,
    SAndH,
}

impl From<u8> for Waveform {
    fn from(value: u8) -> Self {
        match value {
            1 => Waveform::RampDown,
            2 => Waveform::RampUp,
            3 => Waveform::Square,
            4 => Waveform::Sine,
            5 => Waveform::SAndH,
            _ => Waveform::Triangle,
        }
    }
}

/// Modulation amounts produced by one LFO step.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LfoModulations {
    /// Pitch offset in octaves.
    pub pitch_mod: f32,
    /// Amplitude modulation depth, 0 to 1.
    pub amp_mod: f32,
}

#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    frequency: f32,
    delay_phase: f32,
    delay_increment: [f32; 2],

    random_value: f32,
    one_hz: f32,

    amp_mod_depth: f32,
    pitch_mod_depth: f32,

    waveform: Waveform,
    reset_phase: bool,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(SampleRate::default())
    }
}

impl Lfo {
    pub fn new(sample_rate: SampleRate) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            frequency: 0.0,
            delay_phase: 0.0,
            delay_increment: [0.0; 2],
            random_value: 0.0,
            one_hz: 0.0,
            amp_mod_depth: 0.0,
            pitch_mod_depth: 0.0,
            waveform: Waveform::Triangle,
            reset_phase: false,
        };
        lfo.init(sample_rate);

        lfo
    }

    #[inline]
    pub fn init(&mut self, sample_rate: SampleRate) {
        self.phase = 0.0;
        self.frequency = 0.1;
        self.delay_phase = 0.0;
        self.delay_increment = [0.1; 2];
        self.random_value = 0.0;

        self.one_hz = sample_rate.inv_sr;

        self.amp_mod_depth = 0.0;
        self.pitch_mod_depth = 0.0;

        self.waveform = Waveform::Triangle;
        self.reset_phase = false;
    }

    #[inline]
    pub fn set(&mut self, modulations: &ModulationParameters) {
        self.frequency = lfo_frequency(modulations.rate) * self.one_hz;

        self.delay_increment = lfo_delay(modulations.delay).map(|d| d * self.one_hz);

        self.waveform = Waveform::from(modulations.waveform);
        self.reset_phase = modulations.reset_phase;

        self.amp_mod_depth = modulations.amp_mod_depth as f32 * 0.01;

        self.pitch_mod_depth = modulations.pitch_mod_depth as f32
            * 0.01
            * pitch_mod_sensitivity(modulations.pitch_mod_sensitivity);
    }

    /// Restarts the delay ramp, and the cycle if the patch asks for it.
    #[inline]
    pub fn reset(&mut self) {
        if self.reset_phase {
            self.phase = 0.0;
        }

        self.delay_phase = 0.0;
    }

    /// Advances the LFO by `scale` samples.
    #[inline]
    pub fn step(&mut self, scale: f32) -> LfoModulations {
        self.phase += scale * self.frequency;

        if self.phase >= 1.0 {
            self.phase -= 1.0;
            self.random_value = random::get_float();
        }

        self.delay_phase +=
            scale * self.delay_increment[if self.delay_phase < 0.5 { 0 } else { 1 }];

        if self.delay_phase >= 1.0 {
            self.delay_phase = 1.0;
        }

        let value = self.value();
        let ramp = self.delay_ramp();

        LfoModulations {
            pitch_mod: (value - 0.5) * ramp * self.pitch_mod_depth,
            amp_mod: (1.0 - value) * ramp * self.amp_mod_depth,
        }
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Raw waveform value, 0 to 1.
    #[inline]
    pub fn value(&self) -> f32 {
        match self.waveform {
            Waveform::Triangle => {
                2.0 * (if self.phase < 0.5 {
                    0.5 - self.phase
                } else {
                    self.phase - 0.5
                })
            }
            Waveform::RampDown => 1.0 - self.phase,
            Waveform::RampUp => self.phase,
            Waveform::Square => {
                if self.phase < 0.5 {
                    0.0
                } else {
                    1.0
                }
            }
            Waveform::Sine => 0.5 + 0.5 * (PI * (2.0 * self.phase + 1.0)).sin(),
            Waveform::SAndH => self.random_value,
        }
    }

    #[inline]
    pub fn delay_ramp(&self) -> f32 {
        if self.delay_phase < 0.5 {
            0.0
        } else {
            (self.delay_phase - 0.5) * 2.0
        }
    }
}
