//! Errors reported on the control path.
//!
//! Rendering never fails. These only surface when raw data is handed over
//! from outside, before it reaches the audio thread.

use core::{error, fmt};

use crate::fm::patch::PATCH_SIZE;

/// Provides an enumeration of all possible errors reported by the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A patch block shorter than [`PATCH_SIZE`] bytes.
    PatchTooShort { len: usize },
    /// An algorithm index beyond the table of the selected chip.
    UnknownAlgorithm { index: usize, count: usize },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PatchTooShort { len } => {
                write!(f, "Patch data too short: {len} of {PATCH_SIZE} bytes")
            }
            Self::UnknownAlgorithm { index, count } => {
                write!(f, "Algorithm {index} not found (table has {count})")
            }
        }
    }
}
