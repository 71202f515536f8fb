use hashbrown::HashMap;

use common::float_ext::FloatExt;

use crate::band::Band;
use crate::catalog::{Catalog, CatalogError};
use crate::data::Value;
use crate::obs::MISSING_M5_HINT;
use crate::source::{synthetic_star_table, DataSource};

use super::{star_capabilities, star_def, test_obs};

#[test]
fn r_band_magnitude_is_anchored_to_magnorm() {
    let def = star_def("anchor", &["magNorm", "lsst_r"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), test_obs()).unwrap();

    let mut source = synthetic_star_table(5, 15);
    let batch = source.next_chunk(1000).unwrap().unwrap();
    let output = catalog.evaluate_chunk(&batch).unwrap();

    for row in output.rows.iter() {
        let (Value::Float(mag_norm), Value::Float(lsst_r)) = (&row[0], &row[1]) else {
            panic!("expected float cells");
        };
        assert!(lsst_r.within(*mag_norm, 1e-10));
    }
}

#[test]
fn magnitudes_differ_across_bands() {
    let def = star_def("colors", &["lsst_u", "lsst_g", "lsst_z"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), test_obs()).unwrap();

    let mut source = synthetic_star_table(5, 10);
    let batch = source.next_chunk(1000).unwrap().unwrap();
    let output = catalog.evaluate_chunk(&batch).unwrap();

    for row in output.rows.iter() {
        let (Value::Float(u), Value::Float(g), Value::Float(z)) = (&row[0], &row[1], &row[2])
        else {
            panic!("expected float cells");
        };
        assert!(u.is_finite() && g.is_finite() && z.is_finite());
        assert!(!u.approximately_eq(*z));
    }
}

#[test]
fn snr_and_sigma_are_consistent() {
    let def = star_def("uncertainties", &["lsst_g", "snr_lsst_g", "sigma_lsst_g"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), test_obs()).unwrap();

    let mut source = synthetic_star_table(5, 10);
    let batch = source.next_chunk(1000).unwrap().unwrap();
    let output = catalog.evaluate_chunk(&batch).unwrap();

    for row in output.rows.iter() {
        let (Value::Float(_), Value::Float(snr), Value::Float(sigma)) =
            (&row[0], &row[1], &row[2])
        else {
            panic!("expected float cells");
        };
        assert!(*snr > 0.0);
        assert!(sigma.within(2.5 * (1.0 + 1.0 / snr).log10(), 1e-10));
    }
}

#[test]
fn single_band_depth_is_enough_for_that_band() {
    let mut obs = test_obs();
    obs.m5 = HashMap::new();
    obs.m5.insert(Band::U, 23.9);

    let def = star_def("u_depth_only", &["snr_lsst_u"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), obs).unwrap();

    let mut source = synthetic_star_table(5, 5);
    let batch = source.next_chunk(1000).unwrap().unwrap();
    assert!(catalog.evaluate_chunk(&batch).is_ok());
}

#[test]
fn missing_depth_reports_the_hint() {
    let mut obs = test_obs();
    obs.m5.remove(&Band::G);

    let def = star_def("missing_depth", &["snr_lsst_g"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), obs).unwrap();

    let mut source = synthetic_star_table(5, 5);
    let mut sink = Vec::new();
    let err = catalog.write_catalog(&mut source, &mut sink).unwrap_err();

    assert!(matches!(err, CatalogError::Eval(_)));
    let message = err.to_string();
    assert!(message.contains("'g'"));
    assert!(message.contains(MISSING_M5_HINT));
}

#[test]
fn magnitudes_without_depth_still_work() {
    // m5 only gates the SNR chain, not plain magnitudes.
    let mut obs = test_obs();
    obs.m5 = HashMap::new();

    let def = star_def("no_depth", &["lsst_u", "lsst_r"]);
    let mut catalog = Catalog::new(def, &star_capabilities(), obs).unwrap();

    let mut source = synthetic_star_table(5, 5);
    let batch = source.next_chunk(1000).unwrap().unwrap();
    assert!(catalog.evaluate_chunk(&batch).is_ok());
}
