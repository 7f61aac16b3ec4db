//! Errors from reading SJI files.

use std::path::PathBuf;

use thiserror::Error;

use super::fits::FitsError;
use crate::time::TimeParseError;

#[derive(Error, Debug)]
pub enum SjiReadError {
    #[error("Supplied file path {} does not exist or is not readable", .0.display())]
    BadFile(PathBuf),

    #[error("{}: {err}", .file.display())]
    Fits {
        file: PathBuf,
        #[source]
        err: FitsError,
    },

    #[error("{}: couldn't parse {key}: {err}", .file.display())]
    Time {
        file: PathBuf,
        key: &'static str,
        #[source]
        err: TimeParseError,
    },

    #[error("{}: the primary array has no frame axis", .file.display())]
    NoFrames { file: PathBuf },

    #[error(
        "{}: the auxiliary array has shape {shape:?}; expected {num_frames} rows and more than {max_col} columns",
        .file.display()
    )]
    AuxShape {
        file: PathBuf,
        shape: Vec<usize>,
        num_frames: usize,
        max_col: usize,
    },
}
