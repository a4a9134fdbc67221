//! DX7 patch.
//!
//! A patch is the 128-byte packed voice format used inside 32-voice banks.
//! Decoding never rejects a block: every field is masked to its bit width and
//! clamped to the ceiling the hardware accepts.

// Based on MIT-licensed code (c) 2021 by Emilie Gillet (emilie.o.gillet@gmail.com)

use crate::Error;

/// Size of one packed patch in bytes.
pub const PATCH_SIZE: usize = 128;

/// Number of operators stored in a patch.
pub const NUM_OPERATORS: usize = 6;

const OPERATOR_SIZE: usize = 17;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Patch {
    pub op: [Operator; NUM_OPERATORS],
    pub pitch_envelope: Envelope,
    pub algorithm: u8,
    pub feedback: u8,
    pub reset_phase: bool,
    pub modulations: ModulationParameters,
    pub transpose: u8,
    /// Voice name, padded with spaces. Only the low 7 bits of each byte are
    /// kept, so the name is always ASCII.
    pub name: [u8; 10],
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a packed patch. Name bytes are masked to 7-bit ASCII, every
    /// other field is masked and clamped to its range.
    pub fn unpack(data: &[u8; PATCH_SIZE]) -> Self {
        let mut patch = Self::new();

        for (i, op) in patch.op.iter_mut().enumerate() {
            let op_data = &data[(i * OPERATOR_SIZE)..((i + 1) * OPERATOR_SIZE)];
            op.unpack(op_data);
        }

        patch.pitch_envelope.unpack(&data[102..110]);

        patch.algorithm = data[110] & 0x1F;
        patch.feedback = data[111] & 0x07;
        patch.reset_phase = (data[111] >> 3) & 0x01 != 0;

        patch.modulations.rate = clamp_99(data[112]);
        patch.modulations.delay = clamp_99(data[113]);
        patch.modulations.pitch_mod_depth = clamp_99(data[114]);
        patch.modulations.amp_mod_depth = clamp_99(data[115]);
        patch.modulations.reset_phase = data[116] & 0x01 != 0;
        patch.modulations.waveform = u8::min((data[116] >> 1) & 0x07, 5);
        patch.modulations.pitch_mod_sensitivity = (data[116] & 0x7F) >> 4;

        patch.transpose = u8::min(data[117] & 0x7F, 48);

        for (c, byte) in patch.name.iter_mut().zip(&data[118..PATCH_SIZE]) {
            *c = byte & 0x7F;
        }

        patch
    }

    /// Name as text, with the padding kept.
    pub fn name(&self) -> &str {
        // All bytes are masked to 7 bits, which is always valid UTF-8.
        core::str::from_utf8(&self.name).unwrap_or_default()
    }
}

impl TryFrom<&[u8]> for Patch {
    type Error = Error;

    /// Decodes the first [`PATCH_SIZE`] bytes of `data`. Trailing bytes are
    /// ignored.
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let block = data
            .get(..PATCH_SIZE)
            .and_then(|block| <&[u8; PATCH_SIZE]>::try_from(block).ok())
            .ok_or(Error::PatchTooShort { len: data.len() })?;

        Ok(Self::unpack(block))
    }
}

#[inline]
fn clamp_99(byte: u8) -> u8 {
    u8::min(byte & 0x7F, 99)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub rate: [u8; 4],
    pub level: [u8; 4],
}

impl Envelope {
    fn unpack(&mut self, data: &[u8]) {
        for (j, (rate, level)) in self.rate.iter_mut().zip(self.level.iter_mut()).enumerate() {
            *rate = clamp_99(data[j]);
            *level = clamp_99(data[4 + j]);
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyboardScaling {
    pub left_depth: u8,
    pub right_depth: u8,
    pub left_curve: u8,
    pub right_curve: u8,
    pub break_point: u8,
}

/// How the operator frequency is derived.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrequencyMode {
    /// Multiple of the note frequency.
    #[default]
    Ratio,
    /// Constant frequency, independent of the note.
    Fixed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operator {
    pub envelope: Envelope,
    pub keyboard_scaling: KeyboardScaling,

    pub rate_scaling: u8,
    pub amp_mod_sensitivity: u8,
    pub velocity_sensitivity: u8,
    pub level: u8,

    pub mode: FrequencyMode,
    pub coarse: u8,
    pub fine: u8, // x frequency by 1 + 0.01 x fine
    pub detune: u8,
}

impl Operator {
    fn unpack(&mut self, op_data: &[u8]) {
        self.envelope.unpack(op_data);

        self.keyboard_scaling.break_point = clamp_99(op_data[8]);
        self.keyboard_scaling.left_depth = clamp_99(op_data[9]);
        self.keyboard_scaling.right_depth = clamp_99(op_data[10]);
        self.keyboard_scaling.left_curve = op_data[11] & 0x03;
        self.keyboard_scaling.right_curve = (op_data[11] >> 2) & 0x03;

        self.rate_scaling = op_data[12] & 0x07;
        self.detune = u8::min((op_data[12] >> 3) & 0x0F, 14);
        self.amp_mod_sensitivity = op_data[13] & 0x03;
        self.velocity_sensitivity = (op_data[13] >> 2) & 0x07;
        self.level = clamp_99(op_data[14]);
        self.mode = if op_data[15] & 0x01 == 0 {
            FrequencyMode::Ratio
        } else {
            FrequencyMode::Fixed
        };
        self.coarse = (op_data[15] >> 1) & 0x1F;
        self.fine = clamp_99(op_data[16]);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulationParameters {
    pub delay: u8,
    pub rate: u8,
    pub pitch_mod_depth: u8,
    pub amp_mod_depth: u8,
    pub reset_phase: bool,
    pub waveform: u8,
    pub pitch_mod_sensitivity: u8,
}
