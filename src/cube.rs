//! A single IRIS slit-jaw image cube.

use std::{fmt, ops::Range};

use hifitime::Epoch;
use ndarray::{prelude::*, Slice};

use crate::{correction::correct_exposure_time, units::DataUnit, wcs::Wcs, SjiError};

/// Scalar descriptors of an observation, taken from the primary header.
#[derive(Debug, Clone, PartialEq)]
pub struct SjiMeta {
    /// TELESCOP
    pub telescope: Option<String>,
    /// INSTRUME
    pub instrument: Option<String>,
    /// TWAVE1 \[Angstrom\]
    pub bandpass: Option<f64>,
    /// STARTOBS
    pub start_obs: Option<Epoch>,
    /// ENDOBS
    pub end_obs: Option<Epoch>,
    /// The number of frames in the file's primary array.
    pub num_frames: usize,
    /// OBSID
    pub obs_id: Option<String>,
    /// OBS_DESC
    pub obs_desc: Option<String>,
}

/// Values that vary along the frame axis (axis 0) of a cube.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCoords {
    /// The time of each frame.
    pub time: Vec<Epoch>,
    /// PZT X offsets \[arcsec\].
    pub pztx: Array1<f64>,
    /// PZT Y offsets \[arcsec\].
    pub pzty: Array1<f64>,
    /// X coordinate of the image centre \[arcsec\].
    pub xcenix: Array1<f64>,
    /// Y coordinate of the image centre \[arcsec\].
    pub ycenix: Array1<f64>,
    /// Observer radial velocity \[m/s\].
    pub obs_vrix: Array1<f64>,
    /// Orbital phase.
    pub ophaseix: Array1<f64>,
    /// Exposure time \[s\].
    pub exposure_time: Array1<f64>,
}

impl FrameCoords {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn columns_consistent(&self) -> bool {
        let n = self.len();
        [
            &self.pztx,
            &self.pzty,
            &self.xcenix,
            &self.ycenix,
            &self.obs_vrix,
            &self.ophaseix,
            &self.exposure_time,
        ]
        .iter()
        .all(|c| c.len() == n)
    }

    /// The coordinates of a contiguous range of frames.
    pub fn slice(&self, range: Range<usize>) -> FrameCoords {
        let s = |a: &Array1<f64>| a.slice(s![range.clone()]).to_owned();
        FrameCoords {
            time: self.time[range.clone()].to_vec(),
            pztx: s(&self.pztx),
            pzty: s(&self.pzty),
            xcenix: s(&self.xcenix),
            ycenix: s(&self.ycenix),
            obs_vrix: s(&self.obs_vrix),
            ophaseix: s(&self.ophaseix),
            exposure_time: s(&self.exposure_time),
        }
    }
}

/// SJI images described by a single WCS.
///
/// Cubes are values; corrections return new cubes and leave the original
/// untouched.
#[derive(Debug, Clone)]
pub struct SjiCube {
    samples: ArrayD<f64>,

    /// `true` marks a bad sample. Only scaled data have a mask.
    mask: Option<ArrayD<bool>>,

    /// Only scaled data have an uncertainty.
    uncertainty: Option<ArrayD<f64>>,

    unit: DataUnit,

    /// Were BSCALE/BZERO applied when reading? If not, exposure-time
    /// correction isn't available.
    scaled: bool,

    wcs: Wcs,
    frame_coords: FrameCoords,
    meta: SjiMeta,
}

impl SjiCube {
    /// Assemble a cube, checking that the mask and uncertainty have the shape
    /// of the samples and that there is one set of frame coordinates per frame.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        samples: ArrayD<f64>,
        mask: Option<ArrayD<bool>>,
        uncertainty: Option<ArrayD<f64>>,
        unit: DataUnit,
        scaled: bool,
        wcs: Wcs,
        frame_coords: FrameCoords,
        meta: SjiMeta,
    ) -> Result<SjiCube, SjiError> {
        if samples.ndim() == 0 {
            return Err(SjiError::NoFrameAxis);
        }
        if let Some(mask) = mask.as_ref() {
            check_shape("mask", samples.shape(), mask.shape())?;
        }
        if let Some(uncertainty) = uncertainty.as_ref() {
            check_shape("uncertainty", samples.shape(), uncertainty.shape())?;
        }

        let num_frames = samples.len_of(Axis(0));
        if frame_coords.len() != num_frames || !frame_coords.columns_consistent() {
            return Err(SjiError::FrameCoordsLength {
                expected: num_frames,
                found: frame_coords.len(),
            });
        }

        Ok(SjiCube {
            samples,
            mask,
            uncertainty,
            unit,
            scaled,
            wcs,
            frame_coords,
            meta,
        })
    }

    pub fn samples(&self) -> &ArrayD<f64> {
        &self.samples
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    pub fn uncertainty(&self) -> Option<&ArrayD<f64>> {
        self.uncertainty.as_ref()
    }

    pub fn unit(&self) -> DataUnit {
        self.unit
    }

    pub fn is_scaled(&self) -> bool {
        self.scaled
    }

    pub fn wcs(&self) -> &Wcs {
        &self.wcs
    }

    pub fn frame_coords(&self) -> &FrameCoords {
        &self.frame_coords
    }

    pub fn meta(&self) -> &SjiMeta {
        &self.meta
    }

    pub fn dimensions(&self) -> &[usize] {
        self.samples.shape()
    }

    pub fn num_frames(&self) -> usize {
        self.frame_coords.len()
    }

    pub fn world_axis_physical_types(&self) -> Vec<String> {
        self.wcs.world_axis_physical_types()
    }

    /// Applies or undoes exposure time correction to data and uncertainty and
    /// adjusts the unit.
    ///
    /// The correction is only applied (undone) if the unit doesn't (does)
    /// already include inverse time, unless `force` is set, in which case it's
    /// applied (undone) regardless and the unit is still adjusted.
    ///
    /// Cubes read without scaling (memmap) can't be corrected.
    pub fn apply_exposure_time_correction(
        &self,
        undo: bool,
        force: bool,
    ) -> Result<SjiCube, SjiError> {
        if !self.scaled {
            return Err(SjiError::NotScaled);
        }

        let corrected = correct_exposure_time(
            &self.samples,
            self.uncertainty.as_ref(),
            self.unit,
            &self.frame_coords.exposure_time,
            undo,
            force,
        )?;

        Ok(SjiCube {
            samples: corrected.data,
            mask: self.mask.clone(),
            uncertainty: corrected.uncertainty,
            unit: corrected.unit,
            scaled: self.scaled,
            wcs: self.wcs.clone(),
            frame_coords: self.frame_coords.clone(),
            meta: self.meta.clone(),
        })
    }

    /// A new cube made of the frames in `range`.
    pub fn slice_frames(&self, range: Range<usize>) -> Result<SjiCube, SjiError> {
        let num_frames = self.num_frames();
        if range.start > range.end || range.end > num_frames {
            return Err(SjiError::FrameRange {
                start: range.start,
                end: range.end,
                num_frames,
            });
        }

        let slice = Slice::from(range.clone());
        let cut_f64 = |a: &ArrayD<f64>| a.slice_axis(Axis(0), slice).to_owned();

        Ok(SjiCube {
            samples: cut_f64(&self.samples),
            mask: self
                .mask
                .as_ref()
                .map(|m| m.slice_axis(Axis(0), slice).to_owned()),
            uncertainty: self.uncertainty.as_ref().map(cut_f64),
            unit: self.unit,
            scaled: self.scaled,
            wcs: if self.wcs.naxis() == self.samples.ndim() {
                self.wcs.with_frame_offset(range.start)
            } else {
                self.wcs.clone()
            },
            frame_coords: self.frame_coords.slice(range),
            meta: self.meta.clone(),
        })
    }

    /// The times of the first and last frames.
    pub fn frame_time_range(&self) -> Option<(Epoch, Epoch)> {
        match (self.frame_coords.time.first(), self.frame_coords.time.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }
}

fn check_shape(what: &'static str, expected: &[usize], found: &[usize]) -> Result<(), SjiError> {
    if expected == found {
        Ok(())
    } else {
        Err(SjiError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

/// Write `Some` values with `Display`, and `None` otherwise.
pub(crate) struct OrNone<'a, T>(pub(crate) &'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrNone<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "None"),
        }
    }
}

impl fmt::Display for SjiCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.meta;
        let (instance_start, instance_end) = match self.frame_time_range() {
            Some((s, e)) => (Some(s), Some(e)),
            None => (None, None),
        };
        writeln!(f, "SjiCube")?;
        writeln!(f, "-------")?;
        writeln!(f, "Observatory:\t\t {}", OrNone(&meta.telescope))?;
        writeln!(f, "Instrument:\t\t {}", OrNone(&meta.instrument))?;
        writeln!(f, "Bandpass:\t\t {}", OrNone(&meta.bandpass))?;
        writeln!(f, "Obs. Start:\t\t {}", OrNone(&meta.start_obs))?;
        writeln!(f, "Obs. End:\t\t {}", OrNone(&meta.end_obs))?;
        writeln!(f, "Instance Start:\t\t {}", OrNone(&instance_start))?;
        writeln!(f, "Instance End:\t\t {}", OrNone(&instance_end))?;
        writeln!(f, "Total Frames in Obs.:\t {}", meta.num_frames)?;
        writeln!(f, "IRIS Obs. id:\t\t {}", OrNone(&meta.obs_id))?;
        writeln!(f, "IRIS Obs. Description:\t {}", OrNone(&meta.obs_desc))?;
        writeln!(f, "Cube dimensions:\t {:?}", self.dimensions())?;
        writeln!(f, "Unit:\t\t\t {}", self.unit)?;
        write!(f, "Axis Types:\t\t {:?}", self.world_axis_physical_types())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_abs_diff_eq;
    use hifitime::Duration;
    use ndarray::IxDyn;

    use super::*;
    use crate::{
        correction::{estimate_uncertainty, mask_bad_pixels, ScalingMode},
        units::DetectorType,
        wcs::WcsAxis,
    };

    pub(crate) fn test_meta(obs_id: &str) -> SjiMeta {
        SjiMeta {
            telescope: Some("IRIS".to_string()),
            instrument: Some("SJI".to_string()),
            bandpass: Some(1400.0),
            start_obs: Some(Epoch::from_gregorian_utc_hms(2014, 9, 10, 11, 44, 11)),
            end_obs: Some(Epoch::from_gregorian_utc_hms(2014, 9, 10, 12, 44, 11)),
            num_frames: 3,
            obs_id: Some(obs_id.to_string()),
            obs_desc: Some("Large sit-and-stare".to_string()),
        }
    }

    pub(crate) fn test_frame_coords(n: usize) -> FrameCoords {
        let start = Epoch::from_gregorian_utc_hms(2014, 9, 10, 11, 44, 11);
        FrameCoords {
            time: (0..n)
                .map(|i| start + Duration::from_seconds(10.0 * i as f64))
                .collect(),
            pztx: Array1::zeros(n),
            pzty: Array1::zeros(n),
            xcenix: Array1::from_elem(n, -500.0),
            ycenix: Array1::from_elem(n, 200.0),
            obs_vrix: Array1::zeros(n),
            ophaseix: Array1::zeros(n),
            exposure_time: Array1::from_iter((0..n).map(|i| 2.0 + i as f64)),
        }
    }

    pub(crate) fn test_wcs() -> Wcs {
        let axis = |ctype: &str| WcsAxis {
            ctype: Some(ctype.to_string()),
            crpix: 1.0,
            ..Default::default()
        };
        Wcs::new(vec![axis("HPLN-TAN"), axis("HPLT-TAN"), axis("UTC")], None)
    }

    /// A scaled 3-frame cube with one bad pixel at [1, 0, 1].
    pub(crate) fn test_cube(obs_id: &str) -> SjiCube {
        let mut samples = ArrayD::from_elem(IxDyn(&[3, 2, 2]), 50.0);
        samples[[1, 0, 1]] = -200.0;
        let mask = mask_bad_pixels(&mut samples, ScalingMode::Scaled);
        let unit = DetectorType::Sji.dn_unit();
        let uncertainty =
            estimate_uncertainty(&samples, unit, DetectorType::Sji.readout_noise().unwrap())
                .unwrap();
        SjiCube::new(
            samples,
            mask,
            Some(uncertainty),
            unit,
            true,
            test_wcs(),
            test_frame_coords(3),
            test_meta(obs_id),
        )
        .unwrap()
    }

    #[test]
    fn test_new_checks_shapes() {
        let samples = ArrayD::zeros(IxDyn(&[3, 2, 2]));
        let result = SjiCube::new(
            samples.clone(),
            Some(ArrayD::from_elem(IxDyn(&[3, 2]), false)),
            None,
            DetectorType::Sji.dn_unit(),
            true,
            test_wcs(),
            test_frame_coords(3),
            test_meta("1"),
        );
        assert!(matches!(
            result,
            Err(SjiError::ShapeMismatch { what: "mask", .. })
        ));

        let result = SjiCube::new(
            samples,
            None,
            None,
            DetectorType::Sji.dn_unit(),
            true,
            test_wcs(),
            test_frame_coords(2),
            test_meta("1"),
        );
        assert!(matches!(
            result,
            Err(SjiError::FrameCoordsLength {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_new_needs_a_frame_axis() {
        let result = SjiCube::new(
            ArrayD::zeros(IxDyn(&[])),
            None,
            None,
            DetectorType::Sji.dn_unit(),
            true,
            test_wcs(),
            test_frame_coords(0),
            test_meta("1"),
        );
        assert!(matches!(result, Err(SjiError::NoFrameAxis)));
    }

    #[test]
    fn test_slice_frames_empty_range() {
        let cube = test_cube("1");
        let empty = cube.slice_frames(1..1).unwrap();
        assert_eq!(empty.dimensions(), &[0, 2, 2]);
        assert_eq!(empty.num_frames(), 0);
        assert_eq!(empty.mask().unwrap().shape(), &[0, 2, 2]);
    }

    #[test]
    fn test_exposure_correction_returns_new_cube() {
        let cube = test_cube("1");
        let corrected = cube.apply_exposure_time_correction(false, false).unwrap();

        // The original is untouched.
        assert_eq!(cube.unit(), DetectorType::Sji.dn_unit());
        assert_eq!(cube.samples()[[0, 0, 0]], 50.0);

        assert!(corrected.unit().is_exposure_corrected());
        assert_abs_diff_eq!(corrected.samples()[[0, 0, 0]], 25.0);
        assert_abs_diff_eq!(corrected.samples()[[2, 1, 1]], 12.5);
        assert!(corrected.samples()[[1, 0, 1]].is_nan());
        assert_eq!(corrected.mask(), cube.mask());
        assert!(corrected.is_scaled());
        assert_eq!(corrected.wcs(), cube.wcs());
        assert_eq!(corrected.frame_coords(), cube.frame_coords());
        assert_eq!(corrected.meta(), cube.meta());
        assert_abs_diff_eq!(
            corrected.uncertainty().unwrap()[[1, 1, 1]],
            cube.uncertainty().unwrap()[[1, 1, 1]] / 3.0,
            epsilon = 1e-12
        );

        // Idempotent without force.
        let twice = corrected.apply_exposure_time_correction(false, false).unwrap();
        assert_eq!(twice.unit(), corrected.unit());
        assert_eq!(
            twice.samples()[[2, 1, 1]],
            corrected.samples()[[2, 1, 1]]
        );

        let forced = corrected.apply_exposure_time_correction(false, true).unwrap();
        assert_eq!(forced.unit(), corrected.unit().per_second());
        assert_abs_diff_eq!(forced.samples()[[0, 0, 0]], 12.5);

        let undone = corrected.apply_exposure_time_correction(true, false).unwrap();
        assert_eq!(undone.unit(), cube.unit());
        assert_abs_diff_eq!(undone.samples()[[2, 0, 0]], 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unscaled_cube_cannot_be_corrected() {
        let cube = SjiCube::new(
            ArrayD::zeros(IxDyn(&[3, 2, 2])),
            None,
            None,
            DetectorType::SjiUnscaled.dn_unit(),
            false,
            test_wcs(),
            test_frame_coords(3),
            test_meta("1"),
        )
        .unwrap();
        for (undo, force) in [(false, false), (false, true), (true, false), (true, true)] {
            assert!(matches!(
                cube.apply_exposure_time_correction(undo, force),
                Err(SjiError::NotScaled)
            ));
        }
    }

    #[test]
    fn test_rank_four_cannot_be_corrected() {
        let cube = SjiCube::new(
            ArrayD::zeros(IxDyn(&[3, 1, 2, 2])),
            None,
            None,
            DetectorType::Sji.dn_unit(),
            true,
            test_wcs(),
            test_frame_coords(3),
            test_meta("1"),
        )
        .unwrap();
        assert!(matches!(
            cube.apply_exposure_time_correction(false, false),
            Err(SjiError::UnsupportedRank(4))
        ));
    }

    #[test]
    fn test_slice_frames() {
        let cube = test_cube("1");
        let sliced = cube.slice_frames(1..3).unwrap();
        assert_eq!(sliced.dimensions(), &[2, 2, 2]);
        assert_eq!(sliced.frame_coords().len(), 2);
        assert_eq!(sliced.frame_coords().time[0], cube.frame_coords().time[1]);
        assert_eq!(sliced.frame_coords().exposure_time, array![3.0, 4.0]);
        assert!(sliced.mask().unwrap()[[0, 0, 1]]);
        assert_eq!(
            sliced.wcs().pixel_to_world(&[0.0, 0.0, 0.0]).unwrap(),
            cube.wcs().pixel_to_world(&[1.0, 0.0, 0.0]).unwrap()
        );

        assert!(matches!(
            cube.slice_frames(2..4),
            Err(SjiError::FrameRange { .. })
        ));
    }

    #[test]
    fn test_summary() {
        let summary = test_cube("3620258102").to_string();
        assert!(summary.contains("Observatory:\t\t IRIS"));
        assert!(summary.contains("IRIS Obs. id:\t\t 3620258102"));
        assert!(summary.contains("Cube dimensions:\t [3, 2, 2]"));
        assert!(summary.contains("Bandpass:\t\t 1400"));
        assert!(summary.contains("custom:pos.helioprojective.lon"));
    }
}
