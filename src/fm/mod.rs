//! Modules for the 6-operator FM synth.

pub mod algorithms;
pub mod dx_units;
pub mod envelope;
pub mod lfo;
pub mod operator;
pub mod patch;
pub mod voice;
