//! Analytic pair potentials written through the tape
//!
//! These serve as reference energy models for the force pipeline and the MD
//! drivers. Both accept either edge convention: a directed list counts every
//! pair twice, so its per-edge terms carry a factor of one half. Edge offsets
//! make both potentials minimum-image aware for free.

use crate::error::{OxidyneError, Result};
use crate::grad::forces::{EnergyModel, TrackedCoords};
use crate::grad::tape::{Tape, Var};
use crate::graph::batch::GraphBatch;

/// Squared bond length of edge `e`, periodic offset applied to atom j.
fn edge_distance_squared<'t>(
    coords: &TrackedCoords<'t>,
    batch: &GraphBatch,
    e: usize,
) -> Var<'t> {
    let [i, j] = batch.nbr_list[e];
    let off = batch.offsets[e];
    let pi = coords.atom(i);
    let pj = coords.atom(j);
    let dx = pj[0] + off[0] - pi[0];
    let dy = pj[1] + off[1] - pi[1];
    let dz = pj[2] + off[2] - pi[2];
    dx * dx + dy * dy + dz * dz
}

fn pair_weight(batch: &GraphBatch) -> f64 {
    if batch.directed {
        0.5
    } else {
        1.0
    }
}

/// Harmonic bond potential: `E = sum over pairs of k (r - r0)^2`.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicBond {
    k: f64,
    r0: f64,
}

impl HarmonicBond {
    pub fn new(k: f64, r0: f64) -> Result<Self> {
        if !(k > 0.0) || !(r0 > 0.0) {
            return Err(OxidyneError::InvalidParameter(format!(
                "harmonic bond needs positive k and r0, got k={k}, r0={r0}"
            )));
        }
        Ok(Self { k, r0 })
    }
}

impl EnergyModel for HarmonicBond {
    fn energy<'t>(
        &self,
        tape: &'t Tape,
        coords: &TrackedCoords<'t>,
        batch: &GraphBatch,
    ) -> Result<Vec<Var<'t>>> {
        let system_of = batch.system_of_atoms();
        let weight = pair_weight(batch);
        let mut energies: Vec<Var<'t>> = batch.num_atoms.iter().map(|_| tape.var(0.0)).collect();
        for e in 0..batch.nbr_list.len() {
            let r = edge_distance_squared(coords, batch, e).sqrt();
            let stretch = r - self.r0;
            let term = weight * self.k * stretch * stretch;
            let k_sys = system_of[batch.nbr_list[e][0]];
            energies[k_sys] = energies[k_sys] + term;
        }
        Ok(energies)
    }

    fn requires_directed_neighbors(&self) -> bool {
        false
    }
}

/// Lennard-Jones 12-6 potential: `E = sum over pairs of 4 eps [(s/r)^12 - (s/r)^6]`.
#[derive(Debug, Clone, Copy)]
pub struct LennardJones {
    sigma: f64,
    epsilon: f64,
}

impl LennardJones {
    pub fn new(sigma: f64, epsilon: f64) -> Result<Self> {
        if !(sigma > 0.0) || !(epsilon > 0.0) {
            return Err(OxidyneError::InvalidParameter(format!(
                "Lennard-Jones needs positive sigma and epsilon, got sigma={sigma}, epsilon={epsilon}"
            )));
        }
        Ok(Self { sigma, epsilon })
    }

    /// The pair separation that minimizes the potential.
    pub fn r_min(&self) -> f64 {
        2.0_f64.powf(1.0 / 6.0) * self.sigma
    }
}

impl EnergyModel for LennardJones {
    fn energy<'t>(
        &self,
        tape: &'t Tape,
        coords: &TrackedCoords<'t>,
        batch: &GraphBatch,
    ) -> Result<Vec<Var<'t>>> {
        let system_of = batch.system_of_atoms();
        let sigma_sq = self.sigma * self.sigma;
        let weight = pair_weight(batch);
        let mut energies: Vec<Var<'t>> = batch.num_atoms.iter().map(|_| tape.var(0.0)).collect();
        for e in 0..batch.nbr_list.len() {
            let r_sq = edge_distance_squared(coords, batch, e);
            let x6 = (sigma_sq / r_sq).powi(3);
            let x12 = x6 * x6;
            let term = weight * 4.0 * self.epsilon * (x12 - x6);
            let k_sys = system_of[batch.nbr_list[e][0]];
            energies[k_sys] = energies[k_sys] + term;
        }
        Ok(energies)
    }

    fn requires_directed_neighbors(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::neighbors::build_neighbor_list;
    use crate::grad::forces::compute_forces;
    use crate::graph::batch::{collate, SystemGraph};
    use approx::assert_relative_eq;

    fn pair_batch(separation: f64, cutoff: f64) -> GraphBatch {
        let positions = vec![[0.0, 0.0, 0.0], [separation, 0.0, 0.0]];
        let neighbors = build_neighbor_list(&positions, cutoff, None, true).unwrap();
        collate(&[SystemGraph {
            atomic_numbers: vec![18, 18],
            positions,
            neighbors,
            triplets: None,
        }])
        .unwrap()
    }

    #[test]
    fn test_harmonic_energy_and_restoring_force() {
        let model = HarmonicBond::new(2.0, 1.0).unwrap();
        let batch = pair_batch(1.5, 2.0);
        let report = compute_forces(&model, &batch).unwrap();
        assert_relative_eq!(report.energies[0], 2.0 * 0.25, epsilon = 1e-12);
        // Stretched bond pulls the atoms together
        assert!(report.forces[0][0] > 0.0);
        assert!(report.forces[1][0] < 0.0);
        assert_relative_eq!(report.forces[0][0], 2.0 * 2.0 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_lj_minimum() {
        let model = LennardJones::new(1.0, 0.5).unwrap();
        let batch = pair_batch(model.r_min(), 3.0);
        let report = compute_forces(&model, &batch).unwrap();
        // Pair energy at the minimum is -epsilon, forces vanish
        assert_relative_eq!(report.energies[0], -0.5, epsilon = 1e-12);
        for f in &report.forces {
            for c in f {
                assert_relative_eq!(*c, 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_lj_attractive_beyond_minimum() {
        let model = LennardJones::new(1.0, 0.5).unwrap();
        let batch = pair_batch(1.5 * model.r_min(), 3.0);
        let report = compute_forces(&model, &batch).unwrap();
        assert!(report.forces[0][0] > 0.0);
        assert!(report.forces[1][0] < 0.0);
    }

    #[test]
    fn test_lj_repulsive_inside_minimum() {
        let model = LennardJones::new(1.0, 0.5).unwrap();
        let batch = pair_batch(0.9, 3.0);
        let report = compute_forces(&model, &batch).unwrap();
        assert!(report.forces[0][0] < 0.0);
        assert!(report.forces[1][0] > 0.0);
    }

    #[test]
    fn test_directed_and_undirected_lists_agree() {
        let positions = vec![[0.0, 0.0, 0.0], [1.3, 0.0, 0.0], [0.0, 1.2, 0.0]];
        let make = |directed: bool| {
            let neighbors = build_neighbor_list(&positions, 2.0, None, directed).unwrap();
            collate(&[SystemGraph {
                atomic_numbers: vec![18, 18, 18],
                positions: positions.clone(),
                neighbors,
                triplets: None,
            }])
            .unwrap()
        };
        let model = LennardJones::new(1.0, 0.5).unwrap();
        let directed = compute_forces(&model, &make(true)).unwrap();
        let undirected = compute_forces(&model, &make(false)).unwrap();
        assert_relative_eq!(directed.energies[0], undirected.energies[0], epsilon = 1e-12);
        for (a, f) in directed.forces.iter().enumerate() {
            for axis in 0..3 {
                assert_relative_eq!(f[axis], undirected.forces[a][axis], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(HarmonicBond::new(0.0, 1.0).is_err());
        assert!(HarmonicBond::new(1.0, -1.0).is_err());
        assert!(LennardJones::new(-1.0, 0.5).is_err());
        assert!(LennardJones::new(1.0, 0.0).is_err());
    }
}
