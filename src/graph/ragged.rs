//! Ragged per-system coordinate storage
//!
//! Batched systems differ in atom count. Rather than padding every system to
//! the largest one, coordinates are stored flat with an explicit count per
//! system, and consumers slice out exactly the atoms they own.

use crate::error::{OxidyneError, Result};

/// Flat coordinates partitioned by per-system atom counts.
#[derive(Debug, Clone, PartialEq)]
pub struct RaggedCoords {
    counts: Vec<usize>,
    flat: Vec<[f64; 3]>,
}

impl RaggedCoords {
    /// Build from flat coordinates and the per-system partition.
    pub fn new(counts: Vec<usize>, flat: Vec<[f64; 3]>) -> Result<Self> {
        let total: usize = counts.iter().sum();
        if total != flat.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "system counts sum to {total} but {} coordinates given",
                flat.len()
            )));
        }
        Ok(Self { counts, flat })
    }

    pub fn num_systems(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn flat(&self) -> &[[f64; 3]] {
        &self.flat
    }

    pub fn flat_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.flat
    }

    /// Exclusive prefix sum of the per-system counts.
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.counts.len());
        let mut total = 0;
        for &c in &self.counts {
            offsets.push(total);
            total += c;
        }
        offsets
    }

    /// Coordinates of system `k`.
    pub fn system_slice(&self, k: usize) -> &[[f64; 3]] {
        let start: usize = self.counts[..k].iter().sum();
        &self.flat[start..start + self.counts[k]]
    }
}
