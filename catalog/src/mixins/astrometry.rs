use crate::data::ColumnData;
use crate::registry::{Capability, ColumnRegistry, Getter, RegistryError};

// J2000 orientation of the galactic frame.
const NGP_RA_DEG: f64 = 192.85948;
const NGP_DEC_DEG: f64 = 27.12825;
const L_NCP_DEG: f64 = 122.93192;

/// Sky positions corrected for proper motion, plus galactic coordinates.
///
/// Both getters are compound: the two coordinates of a position come out of
/// one invocation and are never computed separately.
pub struct AstrometryStars;

impl Capability for AstrometryStars {
    fn name(&self) -> &str {
        "astrometry_stars"
    }

    fn register(&self, registry: &mut ColumnRegistry) -> Result<(), RegistryError> {
        registry.add(Getter::new(
            "observed_coords",
            &["raObserved", "decObserved"],
            &["raJ2000", "decJ2000", "properMotionRa", "properMotionDec"],
            |ctx| {
                let ra = ctx.floats("raJ2000")?;
                let dec = ctx.floats("decJ2000")?;
                let pm_ra = ctx.floats("properMotionRa")?;
                let pm_dec = ctx.floats("properMotionDec")?;
                let years = ctx.obs().years_since_j2000();

                let mut ra_out = Vec::with_capacity(ctx.rows());
                let mut dec_out = Vec::with_capacity(ctx.rows());
                for row in 0..ctx.rows() {
                    ra_out.push(ra[row] + pm_ra[row] * years);
                    dec_out.push(dec[row] + pm_dec[row] * years);
                }

                Ok(vec![ColumnData::Float(ra_out), ColumnData::Float(dec_out)])
            },
        ))?;

        registry.add(Getter::new(
            "galactic_coords",
            &["glon", "glat"],
            &["raObserved", "decObserved"],
            |ctx| {
                let ra = ctx.floats("raObserved")?;
                let dec = ctx.floats("decObserved")?;

                let mut glon = Vec::with_capacity(ctx.rows());
                let mut glat = Vec::with_capacity(ctx.rows());
                for row in 0..ctx.rows() {
                    let (l, b) = equatorial_to_galactic(ra[row], dec[row]);
                    glon.push(l);
                    glat.push(b);
                }

                Ok(vec![ColumnData::Float(glon), ColumnData::Float(glat)])
            },
        ))?;

        Ok(())
    }
}

/// Rotates a J2000 equatorial position into galactic longitude and latitude,
/// both in degrees with longitude normalized to [0, 360).
pub fn equatorial_to_galactic(ra_deg: f64, dec_deg: f64) -> (f64, f64) {
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let ra_p = NGP_RA_DEG.to_radians();
    let dec_p = NGP_DEC_DEG.to_radians();

    let sin_b = dec.sin() * dec_p.sin() + dec.cos() * dec_p.cos() * (ra - ra_p).cos();
    let b = sin_b.asin();

    let y = dec.cos() * (ra - ra_p).sin();
    let x = dec.sin() * dec_p.cos() - dec.cos() * dec_p.sin() * (ra - ra_p).cos();
    let mut l = L_NCP_DEG - y.atan2(x).to_degrees();
    l = l.rem_euclid(360.0);

    (l, b.to_degrees())
}

/// Fallback kinematics for sources without measured motions: zero proper
/// motion and radial velocity, and a fixed small parallax. Registered in
/// place of native columns, so it also shadows same-named source columns.
pub struct AstrometryDefaults;

impl AstrometryDefaults {
    pub const PARALLAX_DEG: f64 = 4.5e-4;
}

impl Capability for AstrometryDefaults {
    fn name(&self) -> &str {
        "astrometry_defaults"
    }

    fn register(&self, registry: &mut ColumnRegistry) -> Result<(), RegistryError> {
        for column in ["properMotionRa", "properMotionDec", "radialVelocity"] {
            registry.add(Getter::new(column, &[column], &["raJ2000"], |ctx| {
                Ok(vec![ColumnData::Float(vec![0.0; ctx.rows()])])
            }))?;
        }

        registry.add(Getter::new("parallax", &["parallax"], &["raJ2000"], |ctx| {
            Ok(vec![ColumnData::Float(vec![Self::PARALLAX_DEG; ctx.rows()])])
        }))?;

        Ok(())
    }
}
