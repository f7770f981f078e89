//! Per-system Hessians for a ragged batch
//!
//! Each system's Hessian is the Jacobian of its analytic gradient, formed by
//! central finite differences: one coordinate is displaced, the tape gradient
//! is re-evaluated, and the difference quotient fills one row. Systems are
//! handled one at a time over an explicitly ragged batch, so systems of
//! different sizes never share rows and nothing is padded.
//!
//! The displacement must stay well below the neighbor skin; the batch
//! topology is reused across displaced evaluations.

use crate::error::{OxidyneError, Result};
use crate::grad::forces::{EnergyModel, TrackedCoords};
use crate::grad::tape::Tape;
use crate::graph::batch::GraphBatch;
use crate::graph::ragged::RaggedCoords;

/// A dense symmetric second-derivative matrix for one system.
///
/// Rows and columns are atom-major: index `3 * atom + axis`.
#[derive(Debug, Clone)]
pub struct Hessian {
    dim: usize,
    data: Vec<f64>,
}

impl Hessian {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }
}

/// Analytic gradient of system `k`'s energy at the given flat coordinates.
fn system_gradient<M: EnergyModel + ?Sized>(
    model: &M,
    batch: &GraphBatch,
    positions: &[[f64; 3]],
    k: usize,
    range: std::ops::Range<usize>,
) -> Result<Vec<f64>> {
    let tape = Tape::new();
    let coords = TrackedCoords::track(&tape, positions);
    let energies = model.energy(&tape, &coords, batch)?;
    let energy = *energies.get(k).ok_or_else(|| {
        OxidyneError::InvalidParameter(format!(
            "model returned {} energies, expected at least {}",
            energies.len(),
            k + 1
        ))
    })?;
    let grads = tape.gradients(energy);
    let mut gradient = Vec::with_capacity(3 * range.len());
    for a in range {
        let v = coords.atom(a);
        gradient.push(grads.wrt(v[0]));
        gradient.push(grads.wrt(v[1]));
        gradient.push(grads.wrt(v[2]));
    }
    Ok(gradient)
}

/// Hessian of every system in a batch, in batch order.
///
/// `step` is the central-difference displacement.
pub fn batched_hessians<M: EnergyModel + ?Sized>(
    model: &M,
    batch: &GraphBatch,
    step: f64,
) -> Result<Vec<Hessian>> {
    if !(step > 0.0) {
        return Err(OxidyneError::InvalidParameter(format!(
            "finite-difference step must be positive, got {step}"
        )));
    }

    let ragged = RaggedCoords::new(batch.num_atoms.clone(), batch.positions.clone())?;
    let offsets = ragged.offsets();
    let mut hessians = Vec::with_capacity(ragged.num_systems());

    for (k, &n_atoms) in ragged.counts().iter().enumerate() {
        let range = offsets[k]..offsets[k] + n_atoms;
        let dim = 3 * n_atoms;
        let mut data = vec![0.0; dim * dim];
        let mut positions = ragged.flat().to_vec();

        for dof in 0..dim {
            let atom = offsets[k] + dof / 3;
            let axis = dof % 3;
            let original = positions[atom][axis];

            positions[atom][axis] = original + step;
            let plus = system_gradient(model, batch, &positions, k, range.clone())?;
            positions[atom][axis] = original - step;
            let minus = system_gradient(model, batch, &positions, k, range.clone())?;
            positions[atom][axis] = original;

            for col in 0..dim {
                data[dof * dim + col] = (plus[col] - minus[col]) / (2.0 * step);
            }
        }

        hessians.push(Hessian { dim, data });
    }

    Ok(hessians)
}
