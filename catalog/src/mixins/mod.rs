//! Reusable capability bundles: astrometry and photometry getters that
//! catalog types compose into their column registries.

pub mod astrometry;
pub mod photometry;

pub use astrometry::{AstrometryDefaults, AstrometryStars};
pub use photometry::{sum_magnitudes, BandpassGrid, PhotometryGalaxies, PhotometryStars};
