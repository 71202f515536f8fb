use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Survey filter band.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Band {
    pub const ALL: [Band; 6] = [Band::U, Band::G, Band::R, Band::I, Band::Z, Band::Y];

    /// Effective wavelength of the filter in nanometers.
    pub fn effective_wavelength_nm(self) -> f64 {
        match self {
            Band::U => 367.0,
            Band::G => 482.0,
            Band::R => 622.0,
            Band::I => 754.0,
            Band::Z => 869.0,
            Band::Y => 971.0,
        }
    }

    /// Approximate filter full width in nanometers, used to synthesize
    /// throughput curves.
    pub fn width_nm(self) -> f64 {
        match self {
            Band::U => 56.0,
            Band::G => 128.0,
            Band::R => 115.0,
            Band::I => 123.0,
            Band::Z => 107.0,
            Band::Y => 92.0,
        }
    }
}
