//! Triplet (angle) index derivation for angular message passing
//!
//! From a directed neighbor list, derives every path of length two through a
//! shared middle atom, plus the edge-array index maps that let angular
//! message-passing layers gather their two bond messages directly.

use std::collections::HashMap;

use crate::error::{OxidyneError, Result};
use crate::geometry::neighbors::NeighborList;

/// Angle records (i, j, k) with their edge-array index maps.
///
/// For angle n, `edges[ji_idx[n]]` is the reversed first bond (j, i) and
/// `edges[kj_idx[n]]` is the reversed second bond (k, j); those are the two
/// message slots an angular update reads from.
#[derive(Debug, Clone, PartialEq)]
pub struct TripletList {
    pub angles: Vec<[usize; 3]>,
    pub ji_idx: Vec<usize>,
    pub kj_idx: Vec<usize>,
}

impl TripletList {
    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

/// Derive every angle (i, j, k) such that (i, j) and (j, k) are directed
/// edges and k != i.
///
/// The input must be directed; callers holding an undirected list should
/// symmetrize it explicitly first. Output order is deterministic: ascending
/// edge-array order of (i, j), then of the continuation edge (j, k).
pub fn derive_triplets(nbrs: &NeighborList) -> Result<TripletList> {
    if !nbrs.directed {
        return Err(OxidyneError::DirectednessMismatch {
            expected: "directed",
        });
    }

    // Out-edges per atom, kept in edge-array order for determinism, and a
    // reverse lookup from ordered pair to edge index.
    let mut out_edges: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut edge_index: HashMap<(usize, usize), usize> = HashMap::new();
    for (e, &[i, j]) in nbrs.edges.iter().enumerate() {
        out_edges.entry(i).or_default().push(e);
        edge_index.insert((i, j), e);
    }

    let mut angles = Vec::new();
    let mut ji_idx = Vec::new();
    let mut kj_idx = Vec::new();

    for &[i, j] in nbrs.edges.iter() {
        let Some(continuations) = out_edges.get(&j) else {
            continue;
        };
        for &e2 in continuations {
            let k = nbrs.edges[e2][1];
            if k == i {
                continue;
            }
            // The reversed edges are guaranteed to exist in a directed list.
            let ji = *edge_index.get(&(j, i)).ok_or(OxidyneError::DirectednessMismatch {
                expected: "directed",
            })?;
            let kj = *edge_index.get(&(k, j)).ok_or(OxidyneError::DirectednessMismatch {
                expected: "directed",
            })?;
            angles.push([i, j, k]);
            ji_idx.push(ji);
            kj_idx.push(kj);
        }
    }

    Ok(TripletList {
        angles,
        ji_idx,
        kj_idx,
    })
}
