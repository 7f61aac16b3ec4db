//! Reading IRIS level 2 SJI FITS files.

mod error;
pub(crate) mod fits;
mod sji;

pub use error::SjiReadError;
pub use fits::FitsError;
pub use sji::read_sji_file;

use std::path::Path;

use log::{debug, info};

use crate::{SjiCube, SjiCubeSequence, SjiError};

/// Options controlling how SJI files are read.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Read the data as stored on disk (unscaled). Unscaled data have no mask
    /// or uncertainty and can't be exposure-time corrected.
    pub memory_map: bool,
}

/// What was read: one cube per file, grouped into a sequence when there was
/// more than one file.
#[derive(Debug, Clone)]
pub enum SjiData {
    Cube(SjiCube),
    Sequence(SjiCubeSequence),
}

impl SjiData {
    pub fn as_cube(&self) -> Option<&SjiCube> {
        match self {
            SjiData::Cube(c) => Some(c),
            SjiData::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&SjiCubeSequence> {
        match self {
            SjiData::Cube(_) => None,
            SjiData::Sequence(s) => Some(s),
        }
    }
}

impl std::fmt::Display for SjiData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SjiData::Cube(c) => c.fmt(f),
            SjiData::Sequence(s) => s.fmt(f),
        }
    }
}

/// Read IRIS level 2 SJI FITS files from one OBS.
///
/// One file gives an [`SjiCube`]; more give an [`SjiCubeSequence`], in which
/// case every file must have the same OBSID. Files are read one after the
/// other and each is closed before the next is opened; the first failure
/// aborts the whole read.
pub fn read_iris_sji_level2_fits<P: AsRef<Path>>(
    files: &[P],
    options: IngestOptions,
) -> Result<SjiData, SjiError> {
    if files.is_empty() {
        return Err(SjiError::NoInput);
    }

    let mut cubes = Vec::with_capacity(files.len());
    for file in files {
        let cube = read_sji_file(file, options.memory_map)?;
        debug!("Read {} frames from {}", cube.num_frames(), file.as_ref().display());
        cubes.push(cube);
    }
    info!("Read {} SJI file(s)", cubes.len());

    match <[SjiCube; 1]>::try_from(cubes) {
        Ok([cube]) => Ok(SjiData::Cube(cube)),
        // The sequence's metadata are those of the last file.
        Err(cubes) => Ok(SjiData::Sequence(SjiCubeSequence::new(cubes, None)?)),
    }
}
