//! Photometric corrections of SJI data: bad-pixel masking, uncertainty
//! estimation and exposure-time normalisation.

use log::{trace, warn};
use ndarray::prelude::*;

use crate::{
    units::{DataUnit, Quantity},
    SjiError,
};

/// The bad-pixel value of byte-scaled images (after BSCALE/BZERO).
pub const BAD_PIXEL_VALUE_SCALED: f64 = -200.0;
/// The bad-pixel value of unscaled images.
pub const BAD_PIXEL_VALUE_UNSCALED: f64 = -32768.0;

/// The axes to insert into a per-frame exposure-time vector so that it
/// broadcasts against data of rank 1, 2 and 3 (index 0 is rank 1).
pub const EXPOSURE_BROADCAST_AXES: [&[usize]; 3] = [&[], &[1], &[1, 2]];

/// How the samples of a file were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMode {
    /// BSCALE/BZERO applied; data are in scaled DN.
    Scaled,

    /// Raw values as stored on disk (the "memmap" path).
    Unscaled,
}

impl ScalingMode {
    pub fn from_memory_map(memory_map: bool) -> ScalingMode {
        if memory_map {
            ScalingMode::Unscaled
        } else {
            ScalingMode::Scaled
        }
    }
}

/// Replace bad pixels in `samples`.
///
/// Scaled data get NaNs where the scaled sentinel is, and a mask that is
/// `true` at those positions. Unscaled data get zeros and no mask.
///
/// Sentinel matching is exact; no tolerance is applied.
pub fn mask_bad_pixels(samples: &mut ArrayD<f64>, mode: ScalingMode) -> Option<ArrayD<bool>> {
    match mode {
        ScalingMode::Unscaled => {
            samples.mapv_inplace(|v| if v == BAD_PIXEL_VALUE_UNSCALED { 0.0 } else { v });
            None
        }

        ScalingMode::Scaled => {
            // The mask must come from the values before they become NaN.
            let mask = samples.mapv(|v| v == BAD_PIXEL_VALUE_SCALED);
            samples.zip_mut_with(&mask, |v, &bad| {
                if bad {
                    *v = f64::NAN;
                }
            });
            trace!(
                "Masked {} bad pixels",
                mask.iter().filter(|&&bad| bad).count()
            );
            Some(mask)
        }
    }
}

/// Estimate the per-pixel uncertainty of scaled data as shot noise plus the
/// readout noise in quadrature. The calculation is done in photons and the
/// result is expressed in `unit`. NaNs in `samples` stay NaN.
pub fn estimate_uncertainty(
    samples: &ArrayD<f64>,
    unit: DataUnit,
    readout_noise: Quantity,
) -> Result<ArrayD<f64>, SjiError> {
    let photons_per_unit = unit.photons_per_unit()?;
    let readout_noise_photons = readout_noise.to_photons()?;
    let readout_variance = readout_noise_photons * readout_noise_photons;

    Ok(samples.mapv(|v| (v * photons_per_unit + readout_variance).sqrt() / photons_per_unit))
}

/// Reshape per-frame exposure times so they broadcast against an array with
/// `ndim` dimensions whose first axis is the frame axis.
pub fn broadcast_exposure_times(
    exposure_times: &Array1<f64>,
    ndim: usize,
) -> Result<ArrayD<f64>, SjiError> {
    let new_axes = ndim
        .checked_sub(1)
        .and_then(|i| EXPOSURE_BROADCAST_AXES.get(i))
        .ok_or(SjiError::UnsupportedRank(ndim))?;

    let mut broadcast = exposure_times.clone().into_dyn();
    for &axis in new_axes.iter() {
        broadcast = broadcast.insert_axis(Axis(axis));
    }
    Ok(broadcast)
}

/// The result of applying or undoing an exposure-time correction.
#[derive(Debug, Clone)]
pub struct ExposureCorrected {
    pub data: ArrayD<f64>,
    pub uncertainty: Option<ArrayD<f64>>,
    pub unit: DataUnit,
}

/// Apply (or, with `undo`, remove) the exposure-time correction to `data` and
/// `uncertainty`.
///
/// Unless `force` is set, the correction is only applied if `unit` doesn't
/// already have an inverse-time factor, and only undone if it does. Otherwise
/// the inputs are returned unchanged. Forcing the correction still adjusts the
/// unit.
pub fn correct_exposure_time(
    data: &ArrayD<f64>,
    uncertainty: Option<&ArrayD<f64>>,
    unit: DataUnit,
    exposure_times_s: &Array1<f64>,
    undo: bool,
    force: bool,
) -> Result<ExposureCorrected, SjiError> {
    let exposure = broadcast_exposure_times(exposure_times_s, data.ndim())?;
    if exposure_times_s.len() != data.len_of(Axis(0)) {
        return Err(SjiError::ExposureLength {
            expected: data.len_of(Axis(0)),
            found: exposure_times_s.len(),
        });
    }

    let unchanged = || ExposureCorrected {
        data: data.clone(),
        uncertainty: uncertainty.cloned(),
        unit,
    };

    if undo {
        if !force && !unit.is_exposure_corrected() {
            warn!("Data are not exposure time corrected (unit: {unit}); not undoing the correction");
            return Ok(unchanged());
        }
        Ok(ExposureCorrected {
            data: data * &exposure,
            uncertainty: uncertainty.map(|u| u * &exposure),
            unit: unit.times_second(),
        })
    } else {
        if !force && unit.is_exposure_corrected() {
            warn!("Data are already exposure time corrected (unit: {unit}); not applying the correction");
            return Ok(unchanged());
        }
        Ok(ExposureCorrected {
            data: data / &exposure,
            uncertainty: uncertainty.map(|u| u / &exposure),
            unit: unit.per_second(),
        })
    }
}
