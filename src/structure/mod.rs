//! Atomic geometry container
//!
//! Holds the per-atom data a force-field evaluation needs: atomic numbers,
//! Cartesian positions, an optional periodic cell, and the per-system atom
//! counts that partition a concatenated batch into independent systems.

use std::ops::Range;

use crate::error::{OxidyneError, Result};
use crate::geometry::cell::Cell;

/// Atomic numbers, positions, and batch partitioning for one or more systems.
///
/// Positions are mutable over MD steps; atomic numbers and the cell are fixed
/// after construction. Velocities are owned by the integrators, not by the
/// container.
#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<[f64; 3]>,
    atomic_numbers: Vec<u8>,
    cell: Option<Cell>,
    num_atoms_per_system: Vec<usize>,
}

impl Geometry {
    /// Build a single-system geometry.
    pub fn new(atomic_numbers: Vec<u8>, positions: Vec<[f64; 3]>, cell: Option<Cell>) -> Result<Self> {
        let n = positions.len();
        Self::batched(atomic_numbers, positions, cell, vec![n])
    }

    /// Build a batched geometry of several concatenated systems.
    pub fn batched(
        atomic_numbers: Vec<u8>,
        positions: Vec<[f64; 3]>,
        cell: Option<Cell>,
        num_atoms_per_system: Vec<usize>,
    ) -> Result<Self> {
        if atomic_numbers.len() != positions.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} atomic numbers for {} positions",
                atomic_numbers.len(),
                positions.len()
            )));
        }
        let total: usize = num_atoms_per_system.iter().sum();
        if total != positions.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "atom counts sum to {} but there are {} positions",
                total,
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            atomic_numbers,
            cell,
            num_atoms_per_system,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.positions.len()
    }

    pub fn num_systems(&self) -> usize {
        self.num_atoms_per_system.len()
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Mutable access for integrators updating positions in place.
    pub fn positions_mut(&mut self) -> &mut [[f64; 3]] {
        &mut self.positions
    }

    pub fn atomic_numbers(&self) -> &[u8] {
        &self.atomic_numbers
    }

    pub fn cell(&self) -> Option<&Cell> {
        self.cell.as_ref()
    }

    pub fn num_atoms_per_system(&self) -> &[usize] {
        &self.num_atoms_per_system
    }

    /// Index range of system `k` within the concatenated arrays.
    pub fn system_range(&self, k: usize) -> Range<usize> {
        let start: usize = self.num_atoms_per_system[..k].iter().sum();
        start..start + self.num_atoms_per_system[k]
    }

    pub fn system_positions(&self, k: usize) -> &[[f64; 3]] {
        &self.positions[self.system_range(k)]
    }

    pub fn system_atomic_numbers(&self, k: usize) -> &[u8] {
        &self.atomic_numbers[self.system_range(k)]
    }
}
