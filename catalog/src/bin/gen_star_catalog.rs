//! Generates a star catalog from a seeded synthetic table.
//!
//! Usage: `gen_star_catalog [output-path]` (default `star_catalog.txt`).

use std::fs::File;
use std::sync::Arc;

use tracing::info;

use catalog::catalog::{Catalog, CatalogDef};
use catalog::mixins::{AstrometryStars, PhotometryStars};
use catalog::obs::ObservationMetadata;
use catalog::registry::Capability;
use catalog::source::synthetic_star_table;

const CATALOG_DEF: &str = r#"
name: demo_stars
column_outputs:
  [id, raObserved, decObserved, glon, glat, lsst_r, snr_lsst_r, sigma_lsst_r]
cannot_be_null: [lsst_r]
format_overrides:
  id: "%d"
default_float_format: "%.6f"
chunk_size: 500
"#;

const OBSERVATION: &str = r#"
pointing_ra_deg: 200.0
pointing_dec_deg: -30.0
mjd: 60000.5
bands: [u, g, r, i, z, y]
m5:
  u: 23.9
  g: 25.0
  r: 24.7
  i: 24.0
  z: 23.3
  y: 22.1
"#;

fn main() -> anyhow::Result<()> {
    common::log_setup::setup_logging("info");

    let out_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "star_catalog.txt".to_string());

    let def = CatalogDef::from_yaml(CATALOG_DEF)?;
    let obs = ObservationMetadata::from_yaml(OBSERVATION)?;

    let capabilities: Vec<Arc<dyn Capability>> =
        vec![Arc::new(AstrometryStars), Arc::new(PhotometryStars)];
    let mut catalog = Catalog::new(def, &capabilities, obs)?;

    let mut source = synthetic_star_table(42, 2000);
    let file = File::create(&out_path)?;
    catalog.write_catalog(&mut source, file)?;

    info!(path = %out_path, "star catalog written");

    Ok(())
}
