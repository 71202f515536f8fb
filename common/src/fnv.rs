//! Deterministic FNV-1a hashing.
//!
//! `DefaultHasher` is randomly seeded per process, so anything derived from it
//! would change between runs. Catalog generation must be reproducible for a
//! fixed seed, so short keys (SED file names, column names) are hashed with a
//! fixed-seed FNV-1a instead.

use std::hash::Hasher;

/// FNV-1a 64-bit hasher with fixed seed.
#[derive(Debug)]
pub struct FnvHasher(u64);

impl FnvHasher {
    pub fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.0
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
}

/// Hashes a string with a fixed-seed FNV-1a. Stable across processes and runs.
pub fn fnv1a(key: &str) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(key.as_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        assert_eq!(fnv1a("km20_5750.fits_g40_5790"), fnv1a("km20_5750.fits_g40_5790"));
        assert_ne!(fnv1a("m2.0Full.dat"), fnv1a("agn.spec"));
    }

    #[test]
    fn empty_key_is_seed() {
        assert_eq!(fnv1a(""), 0xcbf29ce484222325);
    }
}
