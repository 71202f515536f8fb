use std::sync::Arc;

use hashbrown::HashMap;

use crate::band::Band;
use crate::catalog::CatalogDef;
use crate::mixins::{AstrometryStars, PhotometryStars};
use crate::obs::ObservationMetadata;
use crate::registry::Capability;

mod photometry;

pub(crate) fn test_obs() -> ObservationMetadata {
    let mut m5 = HashMap::new();
    for band in Band::ALL {
        m5.insert(band, 24.0);
    }

    ObservationMetadata {
        pointing_ra_deg: 200.0,
        pointing_dec_deg: -30.0,
        mjd: 52000.0,
        bands: Band::ALL.to_vec(),
        m5,
        time_bounds: None,
    }
}

pub(crate) fn star_capabilities() -> Vec<Arc<dyn Capability>> {
    vec![Arc::new(AstrometryStars), Arc::new(PhotometryStars)]
}

pub(crate) fn star_def(name: &str, columns: &[&str]) -> CatalogDef {
    CatalogDef {
        name: name.to_string(),
        column_outputs: columns.iter().map(|s| s.to_string()).collect(),
        cannot_be_null: Vec::new(),
        default_columns: HashMap::new(),
        format_overrides: HashMap::new(),
        delimiter: ", ".to_string(),
        default_float_format: "%.4f".to_string(),
        chunk_size: 1000,
    }
}
