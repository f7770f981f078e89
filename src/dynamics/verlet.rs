//! NVE dynamics with velocity Verlet
//!
//! Forces come from any [`EnergyModel`] through the tape; the neighbor list
//! is built with `cutoff + skin` and refreshed every `nbr_update_period`
//! steps rather than every step. Units are left to the caller: energies,
//! masses, and the timestep only need to be mutually consistent.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::BOLTZMANN_KCAL;
use crate::error::{OxidyneError, Result};
use crate::grad::forces::{compute_forces, EnergyModel};
use crate::graph::batch::{build_batch, GraphBatch};
use crate::structure::Geometry;

/// Total kinetic energy of a set of point masses.
pub fn kinetic_energy(masses: &[f64], velocities: &[[f64; 3]]) -> f64 {
    masses
        .iter()
        .zip(velocities)
        .map(|(&m, v)| 0.5 * m * (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]))
        .sum()
}

/// Instantaneous temperature from the equipartition theorem.
pub fn temperature(kinetic: f64, num_atoms: usize) -> f64 {
    if num_atoms == 0 {
        return 0.0;
    }
    2.0 * kinetic / (3.0 * num_atoms as f64 * BOLTZMANN_KCAL)
}

/// Draw initial velocities from the Maxwell-Boltzmann distribution.
///
/// Components are sampled as Gaussians with variance `kB T / m` via
/// Box-Muller, then the center-of-mass drift is removed.
pub fn maxwell_boltzmann_velocities(
    masses: &[f64],
    temperature: f64,
    seed: u64,
) -> Result<Vec<[f64; 3]>> {
    if !(temperature >= 0.0) {
        return Err(OxidyneError::InvalidParameter(format!(
            "temperature must be non-negative, got {temperature}"
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut gaussian = move || {
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    };

    let mut velocities: Vec<[f64; 3]> = masses
        .iter()
        .map(|&m| {
            let sigma = (BOLTZMANN_KCAL * temperature / m).sqrt();
            [
                sigma * gaussian(),
                sigma * gaussian(),
                sigma * gaussian(),
            ]
        })
        .collect();

    // Remove center-of-mass drift
    let total_mass: f64 = masses.iter().sum();
    if total_mass > 0.0 {
        let mut drift = [0.0; 3];
        for (&m, v) in masses.iter().zip(&velocities) {
            for axis in 0..3 {
                drift[axis] += m * v[axis] / total_mass;
            }
        }
        for v in &mut velocities {
            for axis in 0..3 {
                v[axis] -= drift[axis];
            }
        }
    }

    Ok(velocities)
}

/// One recorded MD step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: usize,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
    pub temperature: f64,
}

/// Velocity Verlet integrator with periodic neighbor-list refresh.
#[derive(Debug, Clone, Copy)]
pub struct VelocityVerlet {
    dt: f64,
    cutoff: f64,
    skin: f64,
    nbr_update_period: usize,
}

impl VelocityVerlet {
    /// # Arguments
    /// * `dt` - integration timestep (must be positive)
    /// * `cutoff` - interaction cutoff for the energy model
    /// * `skin` - extra neighbor-list margin; the list stays valid as long
    ///   as no atom moves more than `skin / 2` between refreshes
    /// * `nbr_update_period` - steps between neighbor-list rebuilds
    pub fn new(dt: f64, cutoff: f64, skin: f64, nbr_update_period: usize) -> Result<Self> {
        if !(dt > 0.0) {
            return Err(OxidyneError::InvalidParameter(format!(
                "timestep must be positive, got {dt}"
            )));
        }
        if !(cutoff > 0.0) || !(skin >= 0.0) {
            return Err(OxidyneError::InvalidParameter(format!(
                "need positive cutoff and non-negative skin, got cutoff={cutoff}, skin={skin}"
            )));
        }
        if nbr_update_period == 0 {
            return Err(OxidyneError::InvalidParameter(
                "neighbor update period must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dt,
            cutoff,
            skin,
            nbr_update_period,
        })
    }

    fn rebuild_batch<M: EnergyModel + ?Sized>(
        &self,
        geometry: &Geometry,
        model: &M,
    ) -> Result<GraphBatch> {
        build_batch(
            geometry,
            self.cutoff + self.skin,
            model.requires_directed_neighbors(),
            false,
        )
    }

    /// Integrate `steps` steps, mutating positions and velocities in place.
    pub fn run<M: EnergyModel + ?Sized>(
        &self,
        geometry: &mut Geometry,
        velocities: &mut [[f64; 3]],
        masses: &[f64],
        model: &M,
        steps: usize,
    ) -> Result<Vec<StepReport>> {
        let n = geometry.num_atoms();
        if velocities.len() != n || masses.len() != n {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} velocities and {} masses for {n} atoms",
                velocities.len(),
                masses.len()
            )));
        }

        let mut batch = self.rebuild_batch(geometry, model)?;
        let mut report = compute_forces(model, &batch)?;
        let mut reports = Vec::with_capacity(steps);

        for step in 0..steps {
            // Half kick and drift
            for a in 0..n {
                for axis in 0..3 {
                    velocities[a][axis] += 0.5 * self.dt * report.forces[a][axis] / masses[a];
                    geometry.positions_mut()[a][axis] += self.dt * velocities[a][axis];
                }
            }

            if (step + 1) % self.nbr_update_period == 0 {
                batch = self.rebuild_batch(geometry, model)?;
            }
            batch.positions.copy_from_slice(geometry.positions());
            report = compute_forces(model, &batch)?;

            // Second half kick
            for a in 0..n {
                for axis in 0..3 {
                    velocities[a][axis] += 0.5 * self.dt * report.forces[a][axis] / masses[a];
                }
            }

            let potential: f64 = report.energies.iter().sum();
            let kinetic = kinetic_energy(masses, velocities);
            debug!(
                "step {step}: pe = {potential:.6}, ke = {kinetic:.6}",
            );
            reports.push(StepReport {
                step,
                potential_energy: potential,
                kinetic_energy: kinetic,
                temperature: temperature(kinetic, n),
            });
        }

        Ok(reports)
    }
}
