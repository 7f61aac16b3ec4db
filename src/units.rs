//! Physical units of IRIS SJI data and the detector calibration constants.
//!
//! IRIS data numbers (DN) are tied to a photon count through a fixed gain, so
//! scaled SJI data can be converted to photons and back. Unscaled data are
//! plain counts straight off the file and have no photon equivalent.

use std::{fmt, str::FromStr};

use crate::SjiError;

/// The number of photons corresponding to one SJI data number.
pub const PHOTONS_PER_DN_SJI: f64 = 18.0;

/// The SJI readout noise \[DN\].
pub const READOUT_NOISE_DN_SJI: f64 = 1.2;

/// The thing being counted by a [`DataUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountUnit {
    /// Scaled SJI data numbers.
    DnSji,

    /// Unscaled SJI counts, as stored on disk.
    DnSjiUnscaled,

    Photon,
}

impl CountUnit {
    fn name(self) -> &'static str {
        match self {
            CountUnit::DnSji => "DN_IRIS_SJI",
            CountUnit::DnSjiUnscaled => "DN_IRIS_SJI_UNSCALED",
            CountUnit::Photon => "photon",
        }
    }
}

/// A count unit multiplied by an integer power of seconds. Exposure-time
/// corrected data carry a negative power (e.g. DN / s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUnit {
    pub count: CountUnit,
    pub time_power: i32,
}

impl DataUnit {
    pub const fn new(count: CountUnit) -> DataUnit {
        DataUnit {
            count,
            time_power: 0,
        }
    }

    /// This unit divided by seconds.
    pub fn per_second(self) -> DataUnit {
        DataUnit {
            time_power: self.time_power - 1,
            ..self
        }
    }

    /// This unit multiplied by seconds.
    pub fn times_second(self) -> DataUnit {
        DataUnit {
            time_power: self.time_power + 1,
            ..self
        }
    }

    /// Does this unit carry an inverse-time factor?
    pub fn is_exposure_corrected(self) -> bool {
        self.time_power < 0
    }

    /// The number of photons in one of this unit's counts. Unscaled counts
    /// can't be converted.
    pub fn photons_per_unit(self) -> Result<f64, SjiError> {
        match self.count {
            CountUnit::DnSji => Ok(PHOTONS_PER_DN_SJI),
            CountUnit::Photon => Ok(1.0),
            CountUnit::DnSjiUnscaled => Err(SjiError::NoPhotonEquivalent(self.to_string())),
        }
    }
}

impl fmt::Display for DataUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count.name())?;
        match self.time_power {
            0 => Ok(()),
            1 => write!(f, " s"),
            -1 => write!(f, " / s"),
            p if p > 0 => write!(f, " s{p}"),
            p => write!(f, " / s{}", -p),
        }
    }
}

/// A value paired with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: DataUnit,
}

impl Quantity {
    /// Express this quantity in photons.
    pub fn to_photons(self) -> Result<f64, SjiError> {
        Ok(self.value * self.unit.photons_per_unit()?)
    }
}

/// The SJI detector variants, keyed the way calibration tables name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorType {
    /// Scaled photon-counting data.
    Sji,

    /// Raw data read without BSCALE/BZERO applied.
    SjiUnscaled,
}

impl DetectorType {
    pub fn dn_unit(self) -> DataUnit {
        match self {
            DetectorType::Sji => DataUnit::new(CountUnit::DnSji),
            DetectorType::SjiUnscaled => DataUnit::new(CountUnit::DnSjiUnscaled),
        }
    }

    /// The readout noise of the detector. Only scaled data have one.
    pub fn readout_noise(self) -> Option<Quantity> {
        match self {
            DetectorType::Sji => Some(Quantity {
                value: READOUT_NOISE_DN_SJI,
                unit: self.dn_unit(),
            }),
            DetectorType::SjiUnscaled => None,
        }
    }
}

impl FromStr for DetectorType {
    type Err = SjiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SJI" => Ok(DetectorType::Sji),
            "SJI_UNSCALED" => Ok(DetectorType::SjiUnscaled),
            _ => Err(SjiError::UnknownDetector(s.to_string())),
        }
    }
}
