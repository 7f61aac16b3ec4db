//! Several SJI cubes from one observation.

use std::fmt;

use vec1::Vec1;

use crate::{
    cube::{OrNone, SjiCube, SjiMeta},
    SjiError,
};

/// SJI cubes from the same OBSID, ordered along a common (time) axis.
#[derive(Debug, Clone)]
pub struct SjiCubeSequence {
    cubes: Vec1<SjiCube>,
    meta: SjiMeta,
}

impl SjiCubeSequence {
    /// Make a new sequence. All cubes must have the same OBSID. If `meta`
    /// isn't given, the metadata of the last cube are used.
    pub fn new(cubes: Vec<SjiCube>, meta: Option<SjiMeta>) -> Result<SjiCubeSequence, SjiError> {
        let cubes = Vec1::try_from_vec(cubes).map_err(|_| SjiError::EmptySequence)?;

        let obs_id = &cubes.first().meta().obs_id;
        if let Some(other) = cubes.iter().find(|c| &c.meta().obs_id != obs_id) {
            return Err(SjiError::ObsIdMismatch {
                expected: obs_id.clone(),
                found: other.meta().obs_id.clone(),
            });
        }

        let meta = meta.unwrap_or_else(|| cubes.last().meta().clone());
        Ok(SjiCubeSequence { cubes, meta })
    }

    /// The cube axis along which the sequence is ordered.
    pub fn common_axis(&self) -> usize {
        0
    }

    pub fn meta(&self) -> &SjiMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    /// Always false; sequences can't be empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&SjiCube> {
        self.cubes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SjiCube> {
        self.cubes.iter()
    }

    pub fn cubes(&self) -> &[SjiCube] {
        self.cubes.as_slice()
    }

    pub fn into_cubes(self) -> Vec<SjiCube> {
        self.cubes.into_vec()
    }

    /// The dimensions of the cube made by joining all cubes along the common
    /// axis. The other dimensions are those of the first cube.
    pub fn cube_like_dimensions(&self) -> Vec<usize> {
        let mut dims = self.cubes.first().dimensions().to_vec();
        if let Some(first) = dims.first_mut() {
            *first = self.iter().map(|c| c.num_frames()).sum();
        }
        dims
    }

    pub fn world_axis_physical_types(&self) -> Vec<String> {
        self.cubes.first().world_axis_physical_types()
    }

    /// The single-frame cube at `index` along the common axis, counting across
    /// all cubes of the sequence.
    pub fn frame(&self, mut index: usize) -> Option<SjiCube> {
        for cube in self.iter() {
            let n = cube.num_frames();
            if index < n {
                return cube.slice_frames(index..index + 1).ok();
            }
            index -= n;
        }
        None
    }
}

impl<'a> IntoIterator for &'a SjiCubeSequence {
    type Item = &'a SjiCube;
    type IntoIter = std::slice::Iter<'a, SjiCube>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for SjiCubeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.meta;
        let inst_start = self.cubes.first().frame_time_range().map(|(s, _)| s);
        let inst_end = self.cubes.last().frame_time_range().map(|(_, e)| e);
        writeln!(f, "SjiCubeSequence")?;
        writeln!(f, "---------------")?;
        writeln!(f, "Observatory:\t\t {}", OrNone(&meta.telescope))?;
        writeln!(f, "Instrument:\t\t {}", OrNone(&meta.instrument))?;
        writeln!(f)?;
        writeln!(f, "OBS ID:\t\t\t {}", OrNone(&meta.obs_id))?;
        writeln!(f, "OBS Description:\t {}", OrNone(&meta.obs_desc))?;
        writeln!(
            f,
            "OBS period:\t\t {} -- {}",
            OrNone(&meta.start_obs),
            OrNone(&meta.end_obs)
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "Sequence period:\t {} -- {}",
            OrNone(&inst_start),
            OrNone(&inst_end)
        )?;
        writeln!(f, "Sequence Shape:\t\t {:?}", self.cube_like_dimensions())?;
        write!(f, "Axis Types:\t\t {:?}", self.world_axis_physical_types())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::tests::test_cube;

    #[test]
    fn test_mismatched_obsids() {
        let result = SjiCubeSequence::new(vec![test_cube("1"), test_cube("2")], None);
        assert!(matches!(
            result,
            Err(SjiError::ObsIdMismatch { expected, found })
                if expected.as_deref() == Some("1") && found.as_deref() == Some("2")
        ));
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            SjiCubeSequence::new(vec![], None),
            Err(SjiError::EmptySequence)
        ));
    }

    #[test]
    fn test_order_is_preserved() {
        let a = test_cube("7");
        let b = test_cube("7").slice_frames(0..2).unwrap();
        let seq = SjiCubeSequence::new(vec![a, b], None).unwrap();

        assert_eq!(seq.len(), 2);
        assert_eq!(seq.get(0).unwrap().num_frames(), 3);
        assert_eq!(seq.get(1).unwrap().num_frames(), 2);
        assert_eq!(seq.cube_like_dimensions(), vec![5, 2, 2]);
        assert_eq!(seq.meta().obs_id.as_deref(), Some("7"));
        assert_eq!(seq.common_axis(), 0);
    }

    #[test]
    fn test_frame_indexes_across_cubes() {
        let a = test_cube("7");
        let b = test_cube("7").slice_frames(1..3).unwrap();
        let seq = SjiCubeSequence::new(vec![a, b], None).unwrap();

        // Frame 3 is the first frame of the second cube, i.e. frame 1 of the
        // original.
        let frame = seq.frame(3).unwrap();
        assert_eq!(frame.dimensions(), &[1, 2, 2]);
        assert!(frame.mask().unwrap()[[0, 0, 1]]);
        assert_eq!(frame.frame_coords().exposure_time[0], 3.0);
        assert!(seq.frame(5).is_none());
    }

    #[test]
    fn test_summary() {
        let seq = SjiCubeSequence::new(vec![test_cube("42"), test_cube("42")], None).unwrap();
        let summary = seq.to_string();
        assert!(summary.contains("OBS ID:\t\t\t 42"));
        assert!(summary.contains("Sequence Shape:\t\t [6, 2, 2]"));
    }
}
