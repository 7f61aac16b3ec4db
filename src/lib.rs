//! Read IRIS level 2 slit-jaw imager (SJI) FITS files into cubes, and apply
//! simple photometric corrections to them.

pub mod correction;
pub mod cube;
mod error;
pub mod read;
pub mod sequence;
pub mod time;
pub mod units;
pub mod wcs;

pub use cube::{FrameCoords, SjiCube, SjiMeta};
pub use error::SjiError;
pub use read::{read_iris_sji_level2_fits, read_sji_file, IngestOptions, SjiData};
pub use sequence::SjiCubeSequence;
pub use units::{DataUnit, DetectorType};
