//! Errors that can occur anywhere in this crate.

use thiserror::Error;

use crate::read::SjiReadError;

#[derive(Error, Debug)]
pub enum SjiError {
    #[error("No SJI files were supplied")]
    NoInput,

    #[error(transparent)]
    Read(#[from] SjiReadError),

    #[error("Exposure time correction is not available as the data were read unscaled (memmap)")]
    NotScaled,

    #[error("Cannot broadcast exposure times against data with {0} dimensions; only 1, 2 or 3 dimensions are supported")]
    UnsupportedRank(usize),

    #[error("Cube data must have at least one dimension (the frame axis)")]
    NoFrameAxis,

    #[error("Expected {expected} exposure times (one per frame), but got {found}")]
    ExposureLength { expected: usize, found: usize },

    #[error("Unknown detector type '{0}'; expected 'SJI' or 'SJI_UNSCALED'")]
    UnknownDetector(String),

    #[error("Unit '{0}' has no photon equivalent")]
    NoPhotonEquivalent(String),

    #[error("The {what} array has shape {found:?}, but the data have shape {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Expected {expected} per-frame coordinate values, but got {found}")]
    FrameCoordsLength { expected: usize, found: usize },

    #[error("Frame range {start}..{end} is out of bounds for a cube with {num_frames} frames")]
    FrameRange {
        start: usize,
        end: usize,
        num_frames: usize,
    },

    #[error("Constituent SJI cubes must have the same OBSID; found {expected:?} and {found:?}")]
    ObsIdMismatch {
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("An SJI cube sequence cannot be empty")]
    EmptySequence,

    #[error("WCS has {naxis} axes, but {given} pixel coordinates were given")]
    WcsDimensions { naxis: usize, given: usize },
}
