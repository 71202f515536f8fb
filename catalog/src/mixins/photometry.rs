use common::fnv::fnv1a;

use crate::band::Band;
use crate::data::ColumnData;
use crate::registry::{Capability, ColumnRegistry, Getter, RegistryError};

/// SNR gamma parameter for sky-dominated point sources.
const SNR_GAMMA: f64 = 0.039;

/// Second radiation constant hc/k, in nanometer-kelvins.
const HC_OVER_K_NM_K: f64 = 1.4387769e7;

const BANDPASS_GRID_COLUMN: &str = "lsst_bandpass_grid";

/// Synthetic filter throughput curves on a shared wavelength grid.
///
/// Loaded once per catalog lifetime by the `load_lsst_bandpasses` getter and
/// passed to per-band flux getters as a shared column.
pub struct BandpassGrid {
    wavelen_nm: Vec<f64>,
    throughput: [Vec<f64>; 6],
}

impl BandpassGrid {
    /// Gaussian throughput per band, centered on the filter's effective
    /// wavelength, on a 1 nm grid from 300 to 1150 nm.
    pub fn lsst() -> BandpassGrid {
        let wavelen_nm: Vec<f64> = (300..=1150).map(|nm| nm as f64).collect();

        let throughput = Band::ALL.map(|band| {
            let center = band.effective_wavelength_nm();
            let sigma = band.width_nm() / 2.355;
            wavelen_nm
                .iter()
                .map(|&w| (-0.5 * ((w - center) / sigma).powi(2)).exp())
                .collect()
        });

        BandpassGrid {
            wavelen_nm,
            throughput,
        }
    }

    fn throughput_for(&self, band: Band) -> &[f64] {
        let index = Band::ALL.iter().position(|&b| b == band).unwrap_or(0);
        &self.throughput[index]
    }

    /// Throughput-weighted mean blackbody radiance at temperature `temp_k`,
    /// normalized by the throughput integral.
    pub fn mean_flux(&self, band: Band, temp_k: f64) -> f64 {
        let throughput = self.throughput_for(band);

        let mut weighted = 0.0;
        let mut weight = 0.0;
        for (w, t) in self.wavelen_nm.iter().zip(throughput.iter()) {
            let radiance = 1.0 / (w.powi(5) * ((HC_OVER_K_NM_K / (w * temp_k)).exp_m1()));
            weighted += t * radiance;
            weight += t;
        }

        weighted / weight
    }
}

/// Stand-in effective temperature for a named SED, stable across runs.
pub fn sed_temperature(sed_name: &str) -> f64 {
    3000.0 + (fnv1a(sed_name) % 7000) as f64
}

/// Magnitudes and signal-to-noise through the survey filters, anchored so
/// the r-band magnitude equals `magNorm`.
///
/// Column chain per band `{b}`: `flux_lsst_{b}` from the SED and bandpass,
/// `lsst_{b}` from the flux, `snr_lsst_{b}` from the magnitude and the
/// observation's m5 depth, `sigma_lsst_{b}` from the SNR.
pub struct PhotometryStars;

impl Capability for PhotometryStars {
    fn name(&self) -> &str {
        "photometry_stars"
    }

    fn register(&self, registry: &mut ColumnRegistry) -> Result<(), RegistryError> {
        registry.add(Getter::once(
            "load_lsst_bandpasses",
            &[BANDPASS_GRID_COLUMN],
            &[],
            |_| Ok(vec![ColumnData::shared(BandpassGrid::lsst())]),
        ))?;

        for band in Band::ALL {
            let flux_column = format!("flux_lsst_{band}");
            let mag_column = format!("lsst_{band}");
            let snr_column = format!("snr_lsst_{band}");
            let sigma_column = format!("sigma_lsst_{band}");

            registry.add(Getter::new(
                flux_column.clone(),
                &[flux_column.as_str()],
                &["sedFilename", "magNorm", BANDPASS_GRID_COLUMN],
                move |ctx| {
                    let seds = ctx.strs("sedFilename")?;
                    let mag_norm = ctx.floats("magNorm")?;
                    let grid = ctx.shared::<BandpassGrid>(BANDPASS_GRID_COLUMN)?;

                    let mut flux = Vec::with_capacity(ctx.rows());
                    for row in 0..ctx.rows() {
                        let temp = sed_temperature(&seds[row]);
                        let color = grid.mean_flux(band, temp) / grid.mean_flux(Band::R, temp);
                        flux.push(10f64.powf(-0.4 * mag_norm[row]) * color);
                    }

                    Ok(vec![ColumnData::Float(flux)])
                },
            ))?;

            let reads = flux_column.clone();
            registry.add(Getter::new(
                mag_column.clone(),
                &[mag_column.as_str()],
                &[flux_column.as_str()],
                move |ctx| {
                    let flux = ctx.floats(&reads)?;
                    Ok(vec![ColumnData::Float(
                        flux.iter().map(|f| -2.5 * f.log10()).collect(),
                    )])
                },
            ))?;

            let reads = mag_column.clone();
            registry.add(Getter::new(
                snr_column.clone(),
                &[snr_column.as_str()],
                &[mag_column.as_str()],
                move |ctx| {
                    let mag = ctx.floats(&reads)?;
                    let m5 = ctx.obs().m5(band)?;
                    Ok(vec![ColumnData::Float(
                        mag.iter().map(|&m| snr_gamma(m, m5)).collect(),
                    )])
                },
            ))?;

            let reads = snr_column.clone();
            registry.add(Getter::new(
                sigma_column.clone(),
                &[sigma_column.as_str()],
                &[snr_column.as_str()],
                move |ctx| {
                    let snr = ctx.floats(&reads)?;
                    Ok(vec![ColumnData::Float(
                        snr.iter().map(|&s| 2.5 * (1.0 + 1.0 / s).log10()).collect(),
                    )])
                },
            ))?;
        }

        Ok(())
    }
}

/// Photon-statistics SNR for a source of magnitude `mag` against a 5-sigma
/// limiting depth `m5`.
pub fn snr_gamma(mag: f64, m5: f64) -> f64 {
    let x = 10f64.powf(0.4 * (mag - m5));
    1.0 / ((0.04 - SNR_GAMMA) * x + SNR_GAMMA * x * x).sqrt()
}

/// Combines component magnitudes by summing their fluxes. NaN components are
/// skipped; if every component is NaN the sum is NaN.
pub fn sum_magnitudes(components: &[f64]) -> f64 {
    let mut flux = 0.0;
    let mut seen = false;
    for &mag in components {
        if mag.is_nan() {
            continue;
        }
        flux += 10f64.powf(-0.4 * mag);
        seen = true;
    }

    if seen {
        -2.5 * flux.log10()
    } else {
        f64::NAN
    }
}

/// Per-band total galaxy magnitudes summed over bulge, disk, and AGN
/// components (`total_{b}` from `{b}Bulge`, `{b}Disk`, `{b}Agn`).
pub struct PhotometryGalaxies;

impl Capability for PhotometryGalaxies {
    fn name(&self) -> &str {
        "photometry_galaxies"
    }

    fn register(&self, registry: &mut ColumnRegistry) -> Result<(), RegistryError> {
        for band in Band::ALL {
            let total_column = format!("total_{band}");
            let bulge_column = format!("{band}Bulge");
            let disk_column = format!("{band}Disk");
            let agn_column = format!("{band}Agn");

            let reads = (bulge_column.clone(), disk_column.clone(), agn_column.clone());
            registry.add(Getter::new(
                total_column.clone(),
                &[total_column.as_str()],
                &[
                    bulge_column.as_str(),
                    disk_column.as_str(),
                    agn_column.as_str(),
                ],
                move |ctx| {
                    let bulge = ctx.floats(&reads.0)?;
                    let disk = ctx.floats(&reads.1)?;
                    let agn = ctx.floats(&reads.2)?;

                    let mut total = Vec::with_capacity(ctx.rows());
                    for row in 0..ctx.rows() {
                        total.push(sum_magnitudes(&[bulge[row], disk[row], agn[row]]));
                    }

                    Ok(vec![ColumnData::Float(total)])
                },
            ))?;
        }

        Ok(())
    }
}
