use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::band::Band;
use common::FileFormat;

/// Hint appended to missing-m5 errors. Tests match this literal.
pub const MISSING_M5_HINT: &str =
    "Is it possible your ObservationMetaData does not have the proper\nm5 values defined?";

/// A requested bandpass has no 5-sigma limiting magnitude configured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no m5 value defined for bandpass '{band}'. Is it possible your ObservationMetaData does not have the proper\nm5 values defined?")]
pub struct MissingDepth {
    pub band: Band,
}

/// Read-only observation context attached to a catalog at construction.
///
/// Consumed by getters (pointing, epoch, per-band depth), never mutated
/// during evaluation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationMetadata {
    pub pointing_ra_deg: f64,
    pub pointing_dec_deg: f64,
    /// Observation epoch, modified Julian date.
    pub mjd: f64,
    pub bands: Vec<Band>,
    /// 5-sigma limiting magnitude per band.
    #[serde(default)]
    pub m5: HashMap<Band, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_bounds: Option<(f64, f64)>,
}

/// MJD of the J2000.0 reference epoch.
pub const MJD_J2000: f64 = 51544.5;

impl ObservationMetadata {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let format = FileFormat::from_file_name(path)?;
        let serialized = std::fs::read_to_string(path)?;
        Ok(common::deserialize(&serialized, format)?)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(common::serialize(self, FileFormat::Yaml)?)
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(common::deserialize(yaml, FileFormat::Yaml)?)
    }

    /// 5-sigma limiting magnitude for a band, or a descriptive error naming
    /// the missing key.
    pub fn m5(&self, band: Band) -> Result<f64, MissingDepth> {
        self.m5.get(&band).copied().ok_or(MissingDepth { band })
    }

    /// Years elapsed since J2000.0 at the observation epoch.
    pub fn years_since_j2000(&self) -> f64 {
        (self.mjd - MJD_J2000) / 365.25
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_obs() -> ObservationMetadata {
        let mut m5 = HashMap::new();
        m5.insert(Band::U, 23.9);
        m5.insert(Band::G, 25.0);

        ObservationMetadata {
            pointing_ra_deg: 200.0,
            pointing_dec_deg: -30.0,
            mjd: 52000.7,
            bands: vec![Band::U, Band::G],
            m5,
            time_bounds: None,
        }
    }

    #[test]
    fn m5_lookup() {
        let obs = sample_obs();
        assert_eq!(obs.m5(Band::U).unwrap(), 23.9);
        assert_eq!(obs.m5(Band::G).unwrap(), 25.0);
    }

    #[test]
    fn missing_m5_names_band_and_hint() {
        let obs = sample_obs();
        let err = obs.m5(Band::Y).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'y'"));
        assert!(message.contains(MISSING_M5_HINT));
    }

    #[test]
    fn yaml_roundtrip() -> anyhow::Result<()> {
        let obs = sample_obs();
        let yaml = obs.to_yaml()?;
        let parsed = ObservationMetadata::from_yaml(&yaml)?;

        assert_eq!(parsed.pointing_ra_deg, obs.pointing_ra_deg);
        assert_eq!(parsed.mjd, obs.mjd);
        assert_eq!(parsed.bands, obs.bands);
        assert_eq!(parsed.m5.get(&Band::U), Some(&23.9));

        Ok(())
    }

    #[test]
    fn epoch_delta() {
        let obs = sample_obs();
        assert!((obs.years_since_j2000() - (52000.7 - MJD_J2000) / 365.25).abs() < 1e-12);
    }
}
