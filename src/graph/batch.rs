//! Batching independent systems into one reindexed super-graph
//!
//! Many molecules are processed by a single GNN forward pass as one
//! disconnected graph: per-system positions are concatenated and every local
//! edge/angle index is shifted by the cumulative atom count of the preceding
//! systems. Quantities that index into the *edge array* (`ji_idx`, `kj_idx`)
//! are shifted by cumulative edge counts instead.

use rayon::prelude::*;

use crate::error::{OxidyneError, Result};
use crate::geometry::neighbors::{build_neighbor_list, NeighborList};
use crate::geometry::triplets::{derive_triplets, TripletList};
use crate::structure::Geometry;

/// One system's contribution to a batch: atoms plus locally-indexed graphs.
#[derive(Debug, Clone)]
pub struct SystemGraph {
    pub atomic_numbers: Vec<u8>,
    pub positions: Vec<[f64; 3]>,
    pub neighbors: NeighborList,
    pub triplets: Option<TripletList>,
}

/// The concatenated, reindexed batch handed to a GNN forward pass.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    pub atomic_numbers: Vec<u8>,
    pub positions: Vec<[f64; 3]>,
    pub num_atoms: Vec<usize>,
    pub nbr_list: Vec<[usize; 2]>,
    pub offsets: Vec<[f64; 3]>,
    pub directed: bool,
    pub angle_list: Vec<[usize; 3]>,
    pub ji_idx: Vec<usize>,
    pub kj_idx: Vec<usize>,
}

impl GraphBatch {
    pub fn num_atoms_total(&self) -> usize {
        self.positions.len()
    }

    /// Exclusive prefix sum of per-system atom counts.
    pub fn cumulative_atoms(&self) -> Vec<usize> {
        exclusive_prefix_sum(&self.num_atoms)
    }

    /// Map from global atom index to its system index.
    pub fn system_of_atoms(&self) -> Vec<usize> {
        let mut map = Vec::with_capacity(self.num_atoms_total());
        for (k, &n) in self.num_atoms.iter().enumerate() {
            map.extend(std::iter::repeat(k).take(n));
        }
        map
    }
}

fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    let mut cum = Vec::with_capacity(counts.len());
    let mut total = 0;
    for &c in counts {
        cum.push(total);
        total += c;
    }
    cum
}

/// Collate per-system graphs into a single batched super-graph.
///
/// Batch order equals input order, and no reindexed edge or angle can cross
/// a system boundary: local indices stay within their own system's atom
/// range before shifting, and shifting preserves that range.
pub fn collate(systems: &[SystemGraph]) -> Result<GraphBatch> {
    if systems.is_empty() {
        return Err(OxidyneError::InvalidParameter(
            "cannot collate an empty batch".to_string(),
        ));
    }
    let directed = systems[0].neighbors.directed;
    if systems.iter().any(|s| s.neighbors.directed != directed) {
        return Err(OxidyneError::DirectednessMismatch {
            expected: if directed { "directed" } else { "undirected" },
        });
    }
    for s in systems {
        if s.atomic_numbers.len() != s.positions.len() {
            return Err(OxidyneError::InvalidParameter(format!(
                "{} atomic numbers for {} positions in one system",
                s.atomic_numbers.len(),
                s.positions.len()
            )));
        }
    }

    let num_atoms: Vec<usize> = systems.iter().map(|s| s.positions.len()).collect();
    let cum_atoms = exclusive_prefix_sum(&num_atoms);
    let edge_counts: Vec<usize> = systems.iter().map(|s| s.neighbors.len()).collect();
    let cum_edges = exclusive_prefix_sum(&edge_counts);

    let mut batch = GraphBatch {
        atomic_numbers: Vec::new(),
        positions: Vec::new(),
        num_atoms,
        nbr_list: Vec::new(),
        offsets: Vec::new(),
        directed,
        angle_list: Vec::new(),
        ji_idx: Vec::new(),
        kj_idx: Vec::new(),
    };

    for (k, system) in systems.iter().enumerate() {
        let atom_shift = cum_atoms[k];
        let edge_shift = cum_edges[k];

        batch.atomic_numbers.extend_from_slice(&system.atomic_numbers);
        batch.positions.extend_from_slice(&system.positions);

        for &[i, j] in &system.neighbors.edges {
            batch.nbr_list.push([i + atom_shift, j + atom_shift]);
        }
        batch.offsets.extend_from_slice(&system.neighbors.offsets);

        if let Some(triplets) = &system.triplets {
            for &[i, j, l] in &triplets.angles {
                batch
                    .angle_list
                    .push([i + atom_shift, j + atom_shift, l + atom_shift]);
            }
            // ji/kj address the edge array, so they shift by edge counts
            batch.ji_idx.extend(triplets.ji_idx.iter().map(|&e| e + edge_shift));
            batch.kj_idx.extend(triplets.kj_idx.iter().map(|&e| e + edge_shift));
        }
    }

    Ok(batch)
}

/// Build per-system neighbor (and optionally triplet) lists for a batched
/// geometry and collate them. Systems are processed in parallel.
pub fn build_batch(
    geometry: &Geometry,
    cutoff: f64,
    directed: bool,
    with_triplets: bool,
) -> Result<GraphBatch> {
    if with_triplets && !directed {
        return Err(OxidyneError::DirectednessMismatch {
            expected: "directed",
        });
    }

    let systems: Result<Vec<SystemGraph>> = (0..geometry.num_systems())
        .into_par_iter()
        .map(|k| {
            let positions = geometry.system_positions(k).to_vec();
            let atomic_numbers = geometry.system_atomic_numbers(k).to_vec();
            let neighbors = build_neighbor_list(&positions, cutoff, geometry.cell(), directed)?;
            let triplets = if with_triplets {
                Some(derive_triplets(&neighbors)?)
            } else {
                None
            };
            Ok(SystemGraph {
                atomic_numbers,
                positions,
                neighbors,
                triplets,
            })
        })
        .collect();

    collate(&systems?)
}
