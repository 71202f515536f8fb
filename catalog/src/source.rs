use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::band::Band;
use crate::data::ColumnData;

/// A fixed-schema batch of rows holding native columns only.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    columns: HashMap<String, ColumnData>,
    rows: usize,
}

impl RecordBatch {
    pub fn new(rows: usize) -> RecordBatch {
        RecordBatch {
            columns: HashMap::new(),
            rows,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn insert(&mut self, name: impl Into<String>, data: ColumnData) {
        assert_eq!(
            data.len(),
            Some(self.rows),
            "RecordBatch column length mismatch"
        );
        self.columns.insert(name.into(), data);
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|name| name.as_str())
    }
}

/// Pull-based source of row chunks.
///
/// Produces a lazy, finite, non-restartable sequence: each chunk is fully
/// consumed before the next is requested, and exhaustion is signaled by
/// `Ok(None)` (an empty chunk is treated the same way by the consumer).
pub trait DataSource {
    fn next_chunk(&mut self, max_rows: usize) -> anyhow::Result<Option<RecordBatch>>;
}

/// In-memory table source for tests and demos.
#[derive(Debug, Clone)]
pub struct MemorySource {
    columns: Vec<(String, ColumnData)>,
    rows: usize,
    cursor: usize,
}

impl MemorySource {
    pub fn new(columns: Vec<(String, ColumnData)>) -> MemorySource {
        let rows = columns
            .first()
            .and_then(|(_, data)| data.len())
            .unwrap_or(0);
        for (name, data) in columns.iter() {
            assert_eq!(
                data.len(),
                Some(rows),
                "MemorySource column '{}' length mismatch",
                name
            );
        }

        MemorySource {
            columns,
            rows,
            cursor: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl DataSource for MemorySource {
    fn next_chunk(&mut self, max_rows: usize) -> anyhow::Result<Option<RecordBatch>> {
        assert!(max_rows > 0, "chunk size must be positive");

        if self.cursor >= self.rows {
            return Ok(None);
        }

        let end = (self.cursor + max_rows).min(self.rows);
        let mut batch = RecordBatch::new(end - self.cursor);
        for (name, data) in self.columns.iter() {
            let slice = match data {
                ColumnData::Float(values) => ColumnData::Float(values[self.cursor..end].to_vec()),
                ColumnData::Int(values) => ColumnData::Int(values[self.cursor..end].to_vec()),
                ColumnData::Str(values) => ColumnData::Str(values[self.cursor..end].to_vec()),
                ColumnData::Shared(_) => unreachable!("sources hold per-row columns only"),
            };
            batch.insert(name.clone(), slice);
        }

        self.cursor = end;
        Ok(Some(batch))
    }
}

const STAR_SEDS: [&str; 3] = [
    "km20_5750.fits_g40_5790",
    "m2.0Full.dat",
    "bergeron_6500_85.dat_6700",
];

/// Seeded synthetic star table scattered around a pointing.
///
/// Columns: `id`, `raJ2000`, `decJ2000`, `magNorm`, `sedFilename`,
/// `galacticAv`, `properMotionRa`, `properMotionDec`, `parallax`,
/// `radialVelocity`. Reproducible for a fixed seed.
pub fn synthetic_star_table(seed: u64, size: usize) -> MemorySource {
    let mut rng = StdRng::seed_from_u64(seed);

    let pointing_ra = 200.0;
    let pointing_dec = -30.0;
    let radius = 1.0;

    let mut id = Vec::with_capacity(size);
    let mut ra = Vec::with_capacity(size);
    let mut dec = Vec::with_capacity(size);
    let mut mag_norm = Vec::with_capacity(size);
    let mut sed = Vec::with_capacity(size);
    let mut av = Vec::with_capacity(size);
    let mut pm_ra = Vec::with_capacity(size);
    let mut pm_dec = Vec::with_capacity(size);
    let mut parallax = Vec::with_capacity(size);
    let mut vrad = Vec::with_capacity(size);

    for i in 0..size {
        let rr = rng.random::<f64>() * radius;
        let theta = rng.random::<f64>() * 2.0 * std::f64::consts::PI;

        id.push(i as i64);
        ra.push(pointing_ra + rr * theta.cos());
        dec.push(pointing_dec + rr * theta.sin());
        mag_norm.push(rng.random::<f64>() * 4.0 + 17.0);
        sed.push(STAR_SEDS[i % STAR_SEDS.len()].to_string());
        av.push(rng.random::<f64>() * 0.05);
        pm_ra.push(rng.random::<f64>() * 1e-4);
        pm_dec.push(rng.random::<f64>() * 1e-4);
        parallax.push(4.5e-4 + rng.random::<f64>() * 1e-5);
        vrad.push(rng.random::<f64>());
    }

    MemorySource::new(vec![
        ("id".to_string(), ColumnData::Int(id)),
        ("raJ2000".to_string(), ColumnData::Float(ra)),
        ("decJ2000".to_string(), ColumnData::Float(dec)),
        ("magNorm".to_string(), ColumnData::Float(mag_norm)),
        ("sedFilename".to_string(), ColumnData::Str(sed)),
        ("galacticAv".to_string(), ColumnData::Float(av)),
        ("properMotionRa".to_string(), ColumnData::Float(pm_ra)),
        ("properMotionDec".to_string(), ColumnData::Float(pm_dec)),
        ("parallax".to_string(), ColumnData::Float(parallax)),
        ("radialVelocity".to_string(), ColumnData::Float(vrad)),
    ])
}

/// Seeded synthetic galaxy table with per-band bulge/disk/agn component
/// magnitudes. Some components are NaN holes (every 5th bulge, every 7th
/// disk, every 11th agn), so downstream summed magnitudes exercise the
/// missing-component path; a row where all three line up is entirely null
/// in that band.
pub fn synthetic_galaxy_table(seed: u64, size: usize) -> MemorySource {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut columns: Vec<(String, ColumnData)> = Vec::new();

    let mut id = Vec::with_capacity(size);
    let mut ra = Vec::with_capacity(size);
    let mut dec = Vec::with_capacity(size);
    for i in 0..size {
        id.push(i as i64);
        ra.push(rng.random::<f64>() * 10.0);
        dec.push(rng.random::<f64>() * 10.0 - 5.0);
    }
    columns.push(("galid".to_string(), ColumnData::Int(id)));
    columns.push(("raJ2000".to_string(), ColumnData::Float(ra)));
    columns.push(("decJ2000".to_string(), ColumnData::Float(dec)));

    for band in Band::ALL {
        let mut bulge = Vec::with_capacity(size);
        let mut disk = Vec::with_capacity(size);
        let mut agn = Vec::with_capacity(size);

        for i in 0..size {
            let base = rng.random::<f64>() * 4.0 + 17.0;
            bulge.push(if i % 5 == 0 { f64::NAN } else { base });
            disk.push(if i % 7 == 0 { f64::NAN } else { base + 0.2 });
            agn.push(if i % 11 == 0 { f64::NAN } else { base + 0.4 });
        }

        columns.push((format!("{band}Bulge"), ColumnData::Float(bulge)));
        columns.push((format!("{band}Disk"), ColumnData::Float(disk)));
        columns.push((format!("{band}Agn"), ColumnData::Float(agn)));
    }

    MemorySource::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_all_rows_in_order() -> anyhow::Result<()> {
        let mut source = synthetic_star_table(1, 25);
        assert_eq!(source.rows(), 25);

        let mut seen = Vec::new();
        while let Some(batch) = source.next_chunk(10)? {
            assert!(batch.rows() <= 10);
            seen.extend_from_slice(batch.column("id").unwrap().as_ints());
        }

        let expected: Vec<i64> = (0..25).collect();
        assert_eq!(seen, expected);

        Ok(())
    }

    #[test]
    fn exhaustion_is_sticky() -> anyhow::Result<()> {
        let mut source = synthetic_star_table(1, 5);
        assert!(source.next_chunk(10)?.is_some());
        assert!(source.next_chunk(10)?.is_none());
        assert!(source.next_chunk(10)?.is_none());
        Ok(())
    }

    #[test]
    fn seeded_tables_are_reproducible() {
        let a = synthetic_star_table(7, 50);
        let b = synthetic_star_table(7, 50);
        let ra_a = a.columns[1].1.as_floats();
        let ra_b = b.columns[1].1.as_floats();
        assert_eq!(ra_a, ra_b);

        let c = synthetic_star_table(8, 50);
        assert_ne!(ra_a, c.columns[1].1.as_floats());
    }

    #[test]
    fn galaxy_table_has_component_holes() {
        let source = synthetic_galaxy_table(3, 40);
        let bulge = source
            .columns
            .iter()
            .find(|(name, _)| name == "uBulge")
            .map(|(_, data)| data.as_floats())
            .unwrap();

        let nans = bulge.iter().filter(|v| v.is_nan()).count();
        assert!(nans > 0 && nans < bulge.len());
        assert!(bulge[0].is_nan());
        assert!(!bulge[1].is_nan());
    }
}
