//! Forces as the exact negative gradient of a recorded energy
//!
//! An [`EnergyModel`] expresses per-system energies through tape arithmetic;
//! one backward sweep per system then yields every atom's force at once.
//! Because each system's energy is swept independently with a unit seed,
//! forces can never leak between systems of a batch.

use crate::error::{OxidyneError, Result};
use crate::grad::tape::{Tape, Var};
use crate::graph::batch::GraphBatch;

/// Atomic coordinates recorded on a tape, one variable per component.
///
/// Built with [`track`](TrackedCoords::track) when gradients are wanted, or
/// [`constant`](TrackedCoords::constant) for energy-only evaluation. Both
/// feed a model identically; only tracked coordinates can be differentiated.
#[derive(Debug, Clone)]
pub struct TrackedCoords<'t> {
    vars: Vec<[Var<'t>; 3]>,
    grad_enabled: bool,
}

impl<'t> TrackedCoords<'t> {
    /// Record coordinates as differentiable inputs.
    pub fn track(tape: &'t Tape, positions: &[[f64; 3]]) -> Self {
        Self::record(tape, positions, true)
    }

    /// Record coordinates for evaluation only.
    pub fn constant(tape: &'t Tape, positions: &[[f64; 3]]) -> Self {
        Self::record(tape, positions, false)
    }

    fn record(tape: &'t Tape, positions: &[[f64; 3]], grad_enabled: bool) -> Self {
        let vars = positions
            .iter()
            .map(|p| [tape.var(p[0]), tape.var(p[1]), tape.var(p[2])])
            .collect();
        Self { vars, grad_enabled }
    }

    pub fn grad_enabled(&self) -> bool {
        self.grad_enabled
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// The three coordinate variables of atom `i`.
    pub fn atom(&self, i: usize) -> [Var<'t>; 3] {
        self.vars[i]
    }

    fn indices_in(&self, range: std::ops::Range<usize>) -> Vec<usize> {
        self.vars[range]
            .iter()
            .flat_map(|v| v.iter().map(|c| c.index()))
            .collect()
    }
}

/// A potential that writes its per-system energies onto a tape.
pub trait EnergyModel {
    /// Per-system energies for a batch, in batch order.
    fn energy<'t>(
        &self,
        tape: &'t Tape,
        coords: &TrackedCoords<'t>,
        batch: &GraphBatch,
    ) -> Result<Vec<Var<'t>>>;

    /// Whether this model's message passing assumes a directed edge list.
    fn requires_directed_neighbors(&self) -> bool {
        true
    }
}

/// Per-system energies and per-atom forces from one evaluation.
#[derive(Debug, Clone)]
pub struct ForceReport {
    pub energies: Vec<f64>,
    pub forces: Vec<[f64; 3]>,
}

/// Evaluate a model and differentiate it on an existing tape.
///
/// Errors with [`OxidyneError::GradientNotEnabled`] if `coords` were recorded
/// as constants, and with [`OxidyneError::NoGradientPath`] if a system's
/// energy never touches that system's coordinates. A gradient that is merely
/// zero (a stationary geometry) is returned as zero forces, not an error.
pub fn compute_forces_tracked<'t, M: EnergyModel + ?Sized>(
    model: &M,
    tape: &'t Tape,
    coords: &TrackedCoords<'t>,
    batch: &GraphBatch,
) -> Result<ForceReport> {
    if !coords.grad_enabled() {
        return Err(OxidyneError::GradientNotEnabled);
    }
    if model.requires_directed_neighbors() && !batch.directed {
        return Err(OxidyneError::DirectednessMismatch {
            expected: "directed",
        });
    }
    if coords.len() != batch.num_atoms_total() {
        return Err(OxidyneError::InvalidParameter(format!(
            "{} tracked atoms for a batch of {}",
            coords.len(),
            batch.num_atoms_total()
        )));
    }

    let energies = model.energy(tape, coords, batch)?;
    if energies.len() != batch.num_atoms.len() {
        return Err(OxidyneError::InvalidParameter(format!(
            "model returned {} energies for {} systems",
            energies.len(),
            batch.num_atoms.len()
        )));
    }

    let cum = batch.cumulative_atoms();
    let mut forces = vec![[0.0; 3]; coords.len()];
    let mut energy_values = Vec::with_capacity(energies.len());

    for (k, &energy) in energies.iter().enumerate() {
        let range = cum[k]..cum[k] + batch.num_atoms[k];
        let own = coords.indices_in(range.clone());
        if !tape.depends_on_any(energy.index(), &own) {
            return Err(OxidyneError::NoGradientPath);
        }
        let grads = tape.gradients(energy);
        for a in range {
            let v = coords.atom(a);
            forces[a] = [-grads.wrt(v[0]), -grads.wrt(v[1]), -grads.wrt(v[2])];
        }
        energy_values.push(energy.value());
    }

    Ok(ForceReport {
        energies: energy_values,
        forces,
    })
}

/// Evaluate a model on a fresh tape and return energies and forces.
pub fn compute_forces<M: EnergyModel + ?Sized>(model: &M, batch: &GraphBatch) -> Result<ForceReport> {
    let tape = Tape::new();
    let coords = TrackedCoords::track(&tape, &batch.positions);
    compute_forces_tracked(model, &tape, &coords, batch)
}
