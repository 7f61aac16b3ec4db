//! A linear FITS world coordinate system.
//!
//! Only the linear part of the standard is handled (CRPIX, CRVAL, CDELT and
//! the PC matrix); spherical projections are not applied. That is adequate
//! for the small helioprojective fields of view of the slit-jaw imager.

use fitsio::{hdu::FitsHdu, FitsFile};
use ndarray::prelude::*;

use crate::{
    read::fits::{fits_get_optional_key, fits_get_required_key, FitsError},
    SjiError,
};

/// The description of one WCS axis. Axes are numbered as in FITS (the first
/// axis varies fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct WcsAxis {
    pub ctype: Option<String>,
    pub cunit: Option<String>,
    /// 1-based reference pixel.
    pub crpix: f64,
    pub crval: f64,
    pub cdelt: f64,
}

impl Default for WcsAxis {
    fn default() -> Self {
        WcsAxis {
            ctype: None,
            cunit: None,
            crpix: 0.0,
            crval: 0.0,
            cdelt: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    /// In FITS order.
    axes: Vec<WcsAxis>,

    /// `pc[[i, j]]` is PC{i+1}_{j+1}.
    pc: Array2<f64>,
}

impl Wcs {
    /// Make a new WCS from axes in FITS order. Without a PC matrix, the
    /// identity is used.
    pub fn new(axes: Vec<WcsAxis>, pc: Option<Array2<f64>>) -> Wcs {
        let n = axes.len();
        Wcs {
            pc: pc.unwrap_or_else(|| Array2::eye(n)),
            axes,
        }
    }

    /// Read the WCS keywords of the supplied HDU.
    pub(crate) fn from_header(fits_fptr: &mut FitsFile, hdu: &FitsHdu) -> Result<Wcs, FitsError> {
        let naxis: usize = match fits_get_optional_key(fits_fptr, hdu, "WCSAXES")? {
            Some(n) => n,
            None => fits_get_required_key(fits_fptr, hdu, "NAXIS")?,
        };

        let mut axes = Vec::with_capacity(naxis);
        for i in 1..=naxis {
            let default = WcsAxis::default();
            axes.push(WcsAxis {
                ctype: fits_get_optional_key(fits_fptr, hdu, &format!("CTYPE{i}"))?,
                cunit: fits_get_optional_key(fits_fptr, hdu, &format!("CUNIT{i}"))?,
                crpix: fits_get_optional_key(fits_fptr, hdu, &format!("CRPIX{i}"))?
                    .unwrap_or(default.crpix),
                crval: fits_get_optional_key(fits_fptr, hdu, &format!("CRVAL{i}"))?
                    .unwrap_or(default.crval),
                cdelt: fits_get_optional_key(fits_fptr, hdu, &format!("CDELT{i}"))?
                    .unwrap_or(default.cdelt),
            });
        }

        let mut pc: Array2<f64> = Array2::eye(naxis);
        for ((i, j), value) in pc.indexed_iter_mut() {
            let key = format!("PC{}_{}", i + 1, j + 1);
            if let Some(v) = fits_get_optional_key(fits_fptr, hdu, &key)? {
                *value = v;
            }
        }

        Ok(Wcs { axes, pc })
    }

    pub fn naxis(&self) -> usize {
        self.axes.len()
    }

    /// The axes in FITS order.
    pub fn axes(&self) -> &[WcsAxis] {
        &self.axes
    }

    /// The physical types of the world axes, in array (row-major) order.
    pub fn world_axis_physical_types(&self) -> Vec<String> {
        self.axes
            .iter()
            .rev()
            .map(|axis| match axis.ctype.as_deref() {
                Some(ctype) => physical_type(ctype),
                None => "unknown".to_string(),
            })
            .collect()
    }

    /// Convert a 0-based pixel position (array order) to world coordinates
    /// (array order), in the units of CUNIT.
    pub fn pixel_to_world(&self, pixel: &[f64]) -> Result<Vec<f64>, SjiError> {
        let n = self.naxis();
        if pixel.len() != n {
            return Err(SjiError::WcsDimensions {
                naxis: n,
                given: pixel.len(),
            });
        }

        // FITS order, relative to the 1-based reference pixel.
        let offsets: Array1<f64> = pixel
            .iter()
            .rev()
            .zip(self.axes.iter())
            .map(|(p, axis)| p + 1.0 - axis.crpix)
            .collect();
        let intermediate = self.pc.dot(&offsets);

        Ok(intermediate
            .iter()
            .zip(self.axes.iter())
            .map(|(q, axis)| axis.crval + axis.cdelt * q)
            .rev()
            .collect())
    }

    /// The same WCS for data whose slowest axis starts `offset` pixels later.
    pub fn with_frame_offset(&self, offset: usize) -> Wcs {
        let mut wcs = self.clone();
        if let Some(axis) = wcs.axes.last_mut() {
            axis.crpix -= offset as f64;
        }
        wcs
    }
}

fn physical_type(ctype: &str) -> String {
    let prefix = ctype.split('-').next().unwrap_or(ctype).trim();
    match prefix {
        "HPLN" => "custom:pos.helioprojective.lon".to_string(),
        "HPLT" => "custom:pos.helioprojective.lat".to_string(),
        "TIME" | "UTC" => "time".to_string(),
        "WAVE" => "em.wl".to_string(),
        _ => ctype.trim().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn sji_like_wcs() -> Wcs {
        Wcs::new(
            vec![
                WcsAxis {
                    ctype: Some("HPLN-TAN".to_string()),
                    cunit: Some("arcsec".to_string()),
                    crpix: 10.0,
                    crval: -500.0,
                    cdelt: 0.1663,
                },
                WcsAxis {
                    ctype: Some("HPLT-TAN".to_string()),
                    cunit: Some("arcsec".to_string()),
                    crpix: 20.0,
                    crval: 200.0,
                    cdelt: 0.1663,
                },
                WcsAxis {
                    ctype: Some("UTC".to_string()),
                    cunit: Some("s".to_string()),
                    crpix: 1.0,
                    crval: 0.0,
                    cdelt: 10.0,
                },
            ],
            None,
        )
    }

    #[test]
    fn test_physical_types_are_in_array_order() {
        assert_eq!(
            sji_like_wcs().world_axis_physical_types(),
            vec![
                "time",
                "custom:pos.helioprojective.lat",
                "custom:pos.helioprojective.lon"
            ]
        );
    }

    #[test]
    fn test_pixel_to_world() {
        let wcs = sji_like_wcs();
        // Reference pixel (1-based 10, 20, 1) is (0-based) [0, 19, 9].
        let world = wcs.pixel_to_world(&[0.0, 19.0, 9.0]).unwrap();
        assert_abs_diff_eq!(world[0], 0.0);
        assert_abs_diff_eq!(world[1], 200.0);
        assert_abs_diff_eq!(world[2], -500.0);

        let world = wcs.pixel_to_world(&[3.0, 20.0, 9.0]).unwrap();
        assert_abs_diff_eq!(world[0], 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(world[1], 200.1663, epsilon = 1e-12);

        assert!(matches!(
            wcs.pixel_to_world(&[0.0, 0.0]),
            Err(SjiError::WcsDimensions { naxis: 3, given: 2 })
        ));
    }

    #[test]
    fn test_pc_matrix_rotates() {
        let axis = WcsAxis {
            crpix: 1.0,
            ..Default::default()
        };
        let pc = array![[0.0, -1.0], [1.0, 0.0]];
        let wcs = Wcs::new(vec![axis.clone(), axis], Some(pc));
        // Array order [y, x] = [0, 1] is FITS (x, y) = (1, 0).
        let world = wcs.pixel_to_world(&[0.0, 1.0]).unwrap();
        assert_abs_diff_eq!(world[0], 1.0);
        assert_abs_diff_eq!(world[1], 0.0);
    }

    #[test]
    fn test_frame_offset() {
        let wcs = sji_like_wcs();
        let shifted = wcs.with_frame_offset(2);
        let a = wcs.pixel_to_world(&[2.0, 0.0, 0.0]).unwrap();
        let b = shifted.pixel_to_world(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(a, b);
    }
}
