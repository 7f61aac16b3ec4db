//! Reading a single IRIS level 2 SJI FITS file.
//!
//! A level 2 SJI file has the image cube in its primary HDU and an auxiliary
//! 2D array in HDU 1. Each row of the auxiliary array belongs to one frame;
//! keys in the auxiliary header give the column holding each quantity.

use std::path::Path;

use fitsio::{hdu::FitsHdu, FitsFile};
use hifitime::{Duration, Epoch};
use log::{debug, trace};
use ndarray::prelude::*;

use super::{
    fits::{
        fits_get_image, fits_get_optional_key, fits_get_required_key, fits_get_unscaled_image,
        fits_open, fits_open_hdu, FitsError,
    },
    SjiReadError,
};
use crate::{
    correction::{estimate_uncertainty, mask_bad_pixels, ScalingMode},
    cube::{FrameCoords, SjiCube, SjiMeta},
    time::parse_iris_time,
    units::DetectorType,
    wcs::Wcs,
    SjiError,
};

/// The auxiliary-header keys whose values are column indices into the
/// auxiliary array.
#[derive(Debug)]
struct AuxColumns {
    exposure_time: usize,
    time: usize,
    pztx: usize,
    pzty: usize,
    xcenix: usize,
    ycenix: usize,
    obs_vrix: usize,
    ophaseix: usize,
}

impl AuxColumns {
    fn new(fits_fptr: &mut FitsFile, hdu: &FitsHdu) -> Result<AuxColumns, FitsError> {
        Ok(AuxColumns {
            exposure_time: fits_get_required_key(fits_fptr, hdu, "EXPTIMES")?,
            time: fits_get_required_key(fits_fptr, hdu, "TIME")?,
            pztx: fits_get_required_key(fits_fptr, hdu, "PZTX")?,
            pzty: fits_get_required_key(fits_fptr, hdu, "PZTY")?,
            xcenix: fits_get_required_key(fits_fptr, hdu, "XCENIX")?,
            ycenix: fits_get_required_key(fits_fptr, hdu, "YCENIX")?,
            obs_vrix: fits_get_required_key(fits_fptr, hdu, "OBS_VRIX")?,
            ophaseix: fits_get_required_key(fits_fptr, hdu, "OPHASEIX")?,
        })
    }

    fn max(&self) -> usize {
        [
            self.exposure_time,
            self.time,
            self.pztx,
            self.pzty,
            self.xcenix,
            self.ycenix,
            self.obs_vrix,
            self.ophaseix,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Read an IRIS level 2 SJI FITS file into an [`SjiCube`].
///
/// With `memory_map`, the primary array is read as stored on disk (no
/// BSCALE/BZERO), bad pixels become 0 and there is no mask or uncertainty.
/// Otherwise bad pixels become NaN and are masked, and an uncertainty is
/// estimated from the detector's readout noise.
///
/// The file is closed before returning, whether or not reading succeeded.
pub fn read_sji_file<P: AsRef<Path>>(file: P, memory_map: bool) -> Result<SjiCube, SjiError> {
    let file = file.as_ref();
    debug!("Using SJI file: {}", file.display());
    if !file.exists() {
        return Err(SjiReadError::BadFile(file.to_path_buf()).into());
    }
    let fits_err = |err: FitsError| SjiReadError::Fits {
        file: file.to_path_buf(),
        err,
    };

    let mut fptr = fits_open(file).map_err(fits_err)?;
    let primary_hdu = fits_open_hdu(&mut fptr, 0).map_err(fits_err)?;

    let wcs = Wcs::from_header(&mut fptr, &primary_hdu).map_err(fits_err)?;
    let mut meta = read_meta(&mut fptr, &primary_hdu, file)?;

    let mode = ScalingMode::from_memory_map(memory_map);
    let mut samples = match mode {
        ScalingMode::Scaled => fits_get_image(&mut fptr, &primary_hdu),
        ScalingMode::Unscaled => fits_get_unscaled_image(&mut fptr, &primary_hdu),
    }
    .map_err(fits_err)?;
    meta.num_frames = match samples.shape().first() {
        Some(&n) if samples.ndim() > 0 => n,
        _ => {
            return Err(SjiReadError::NoFrames {
                file: file.to_path_buf(),
            }
            .into())
        }
    };
    debug!("Data shape: {:?} ({mode:?})", samples.shape());

    let mask = mask_bad_pixels(&mut samples, mode);
    let detector = match mode {
        ScalingMode::Scaled => DetectorType::Sji,
        ScalingMode::Unscaled => DetectorType::SjiUnscaled,
    };
    let unit = detector.dn_unit();
    let uncertainty = match detector.readout_noise() {
        Some(readout_noise) => Some(estimate_uncertainty(&samples, unit, readout_noise)?),
        None => None,
    };

    let aux_hdu = fits_open_hdu(&mut fptr, 1).map_err(fits_err)?;
    let frame_coords =
        read_frame_coords(&mut fptr, &aux_hdu, meta.start_obs, meta.num_frames, file)?;

    SjiCube::new(
        samples,
        mask,
        uncertainty,
        unit,
        mode == ScalingMode::Scaled,
        wcs,
        frame_coords,
        meta,
    )
}

fn read_meta(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    file: &Path,
) -> Result<SjiMeta, SjiReadError> {
    let fits_err = |err: FitsError| SjiReadError::Fits {
        file: file.to_path_buf(),
        err,
    };
    let mut optional_string =
        |key: &str| fits_get_optional_key::<String>(fits_fptr, hdu, key).map_err(fits_err);

    let telescope = optional_string("TELESCOP")?;
    let instrument = optional_string("INSTRUME")?;
    let obs_id = optional_string("OBSID")?;
    let obs_desc = optional_string("OBS_DESC")?;
    let start_obs = optional_string("STARTOBS")?;
    let end_obs = optional_string("ENDOBS")?;
    let bandpass = fits_get_optional_key(fits_fptr, hdu, "TWAVE1").map_err(fits_err)?;

    let meta = SjiMeta {
        telescope,
        instrument,
        bandpass,
        start_obs: parse_optional_time(file, "STARTOBS", start_obs)?,
        end_obs: parse_optional_time(file, "ENDOBS", end_obs)?,
        num_frames: 0,
        obs_id,
        obs_desc,
    };
    debug!("OBSID: {:?}", meta.obs_id);
    debug!("STARTOBS: {:?}", meta.start_obs);
    Ok(meta)
}

fn parse_optional_time(
    file: &Path,
    key: &'static str,
    value: Option<String>,
) -> Result<Option<Epoch>, SjiReadError> {
    value
        .map(|v| {
            parse_iris_time(&v).map_err(|err| SjiReadError::Time {
                file: file.to_path_buf(),
                key,
                err,
            })
        })
        .transpose()
}

fn read_frame_coords(
    fits_fptr: &mut FitsFile,
    hdu: &FitsHdu,
    start_obs: Option<Epoch>,
    num_frames: usize,
    file: &Path,
) -> Result<FrameCoords, SjiReadError> {
    let fits_err = |err: FitsError| SjiReadError::Fits {
        file: file.to_path_buf(),
        err,
    };

    let columns = AuxColumns::new(fits_fptr, hdu).map_err(fits_err)?;
    trace!("Auxiliary columns: {columns:?}");

    let aux = fits_get_image(fits_fptr, hdu).map_err(fits_err)?;
    let shape = aux.shape().to_vec();
    let aux = match aux.into_dimensionality::<Ix2>() {
        Ok(aux) if aux.nrows() == num_frames && aux.ncols() > columns.max() => aux,
        _ => {
            return Err(SjiReadError::AuxShape {
                file: file.to_path_buf(),
                shape,
                num_frames,
                max_col: columns.max(),
            })
        }
    };

    // Frame times are offsets from the start of the observation.
    let start_obs = start_obs.ok_or_else(|| {
        fits_err(FitsError::MissingKey {
            key: "STARTOBS".to_string(),
            hdu_num: 0,
        })
    })?;
    let time = aux
        .column(columns.time)
        .iter()
        .map(|&s| start_obs + Duration::from_seconds(s))
        .collect();

    let column = |i: usize| aux.column(i).to_owned();
    Ok(FrameCoords {
        time,
        pztx: column(columns.pztx),
        pzty: column(columns.pzty),
        xcenix: column(columns.xcenix),
        ycenix: column(columns.ycenix),
        obs_vrix: column(columns.obs_vrix),
        ophaseix: column(columns.ophaseix),
        exposure_time: column(columns.exposure_time),
    })
}
