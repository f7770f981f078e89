//! Cutoff-based neighbor list construction
//!
//! Builds the pair list consumed by message-passing potentials. Distances are
//! evaluated on minimum-image-corrected displacements when a periodic cell is
//! supplied, so pairs straddling a cell boundary are never missed.
//!
//! For MD use, callers pass `cutoff + skin` and rebuild the list every
//! `nbr_update_period` steps; choosing the skin large enough relative to the
//! maximum per-step displacement is the caller's contract.

use log::debug;

use crate::error::{OxidyneError, Result};
use crate::geometry::cell::Cell;

/// A pair list with per-edge periodic image offsets.
///
/// A **directed** list stores both (i, j) and (j, i) for every interacting
/// pair; an **undirected** list stores only (i, j) with i < j. Offsets are
/// literal Cartesian vectors added to atom j to reach its minimum image
/// relative to atom i (zero for non-periodic systems).
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborList {
    pub edges: Vec<[usize; 2]>,
    pub offsets: Vec<[f64; 3]>,
    pub directed: bool,
}

impl NeighborList {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Convert an undirected list into a directed one by appending the
    /// reverse of every edge. Offsets are negated for the reversed edges.
    ///
    /// A list that is already directed is returned unchanged.
    pub fn symmetrize(self) -> NeighborList {
        if self.directed {
            return self;
        }
        let mut edges = self.edges;
        let mut offsets = self.offsets;
        let n = edges.len();
        edges.reserve(n);
        offsets.reserve(n);
        for k in 0..n {
            let [i, j] = edges[k];
            let off = offsets[k];
            edges.push([j, i]);
            offsets.push([-off[0], -off[1], -off[2]]);
        }
        NeighborList {
            edges,
            offsets,
            directed: true,
        }
    }
}

/// Build a neighbor list for one system.
///
/// # Arguments
/// * `positions` - (N, 3) atom positions
/// * `cutoff` - maximum interaction distance (must be positive)
/// * `cell` - periodic cell, or `None` for an isolated system
/// * `directed` - store both edge directions, or only (i, j) with i < j
pub fn build_neighbor_list(
    positions: &[[f64; 3]],
    cutoff: f64,
    cell: Option<&Cell>,
    directed: bool,
) -> Result<NeighborList> {
    if !(cutoff > 0.0) {
        return Err(OxidyneError::InvalidParameter(format!(
            "cutoff must be positive, got {cutoff}"
        )));
    }
    if let Some(cell) = cell {
        cell.check_cutoff(cutoff)?;
    }

    let n = positions.len();
    let cutoff_sq = cutoff * cutoff;
    let mut edges = Vec::new();
    let mut offsets = Vec::new();

    for i in 0..n {
        // Undirected lists only keep i < j; directed lists visit every
        // ordered pair.
        let j_start = if directed { 0 } else { i + 1 };
        for j in j_start..n {
            if i == j {
                continue;
            }
            let raw = [
                positions[j][0] - positions[i][0],
                positions[j][1] - positions[i][1],
                positions[j][2] - positions[i][2],
            ];
            let (disp, offset) = match cell {
                Some(cell) => cell.min_image(raw),
                None => (raw, [0.0; 3]),
            };
            let dist_sq = disp[0] * disp[0] + disp[1] * disp[1] + disp[2] * disp[2];
            if dist_sq > 0.0 && dist_sq <= cutoff_sq {
                edges.push([i, j]);
                offsets.push(offset);
            }
        }
    }

    debug!(
        "neighbor list: {} atoms, cutoff {}, {} edges ({})",
        n,
        cutoff,
        edges.len(),
        if directed { "directed" } else { "undirected" }
    );

    Ok(NeighborList {
        edges,
        offsets,
        directed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
        let dx = a[0] - b[0];
        let dy = a[1] - b[1];
        let dz = a[2] - b[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    #[test]
    fn test_two_carbons_within_cutoff() {
        // Two carbons 1.5 apart, cutoff 2.0, directed
        let positions = [[0.0, 0.0, 0.0], [1.5, 0.0, 0.0]];
        let nbrs = build_neighbor_list(&positions, 2.0, None, true).unwrap();
        let edges: HashSet<_> = nbrs.edges.iter().copied().collect();
        assert_eq!(edges, HashSet::from([[0, 1], [1, 0]]));
        assert_eq!(nbrs.offsets, vec![[0.0; 3], [0.0; 3]]);
    }

    #[test]
    fn test_two_carbons_beyond_cutoff() {
        let positions = [[0.0, 0.0, 0.0], [1.5, 0.0, 0.0]];
        let nbrs = build_neighbor_list(&positions, 1.0, None, true).unwrap();
        assert!(nbrs.is_empty());
    }

    #[test]
    fn test_periodic_wraparound_edge() {
        // Atoms at x = 0.2 and x = 3.9 in a cell of length 4: raw distance
        // 3.7, minimum-image distance 0.3.
        let cell = Cell::orthorhombic([4.0, 20.0, 20.0]).unwrap();
        let positions = [[0.2, 0.0, 0.0], [3.9, 0.0, 0.0]];
        let nbrs = build_neighbor_list(&positions, 0.5, Some(&cell), true).unwrap();
        assert_eq!(nbrs.len(), 2);
        let idx = nbrs.edges.iter().position(|e| e == &[0, 1]).unwrap();
        assert_eq!(nbrs.offsets[idx], [-4.0, 0.0, 0.0]);
        let idx_rev = nbrs.edges.iter().position(|e| e == &[1, 0]).unwrap();
        assert_eq!(nbrs.offsets[idx_rev], [4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_directed_symmetry() {
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.2, 0.0],
            [5.0, 5.0, 5.0],
        ];
        let nbrs = build_neighbor_list(&positions, 2.0, None, true).unwrap();
        let edges: HashSet<_> = nbrs.edges.iter().copied().collect();
        for &[i, j] in &nbrs.edges {
            assert!(edges.contains(&[j, i]), "missing reverse of ({i}, {j})");
        }
    }

    #[test]
    fn test_cutoff_correctness_both_directions() {
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.4, 0.0],
            [3.0, 3.0, 3.0],
        ];
        let cutoff = 2.5;
        let nbrs = build_neighbor_list(&positions, cutoff, None, true).unwrap();
        let edges: HashSet<_> = nbrs.edges.iter().copied().collect();
        for i in 0..positions.len() {
            for j in 0..positions.len() {
                if i == j {
                    continue;
                }
                let d = distance(&positions[i], &positions[j]);
                assert_eq!(
                    edges.contains(&[i, j]),
                    d <= cutoff,
                    "pair ({i}, {j}) at distance {d}"
                );
            }
        }
    }

    #[test]
    fn test_undirected_keeps_lower_index_first() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let nbrs = build_neighbor_list(&positions, 1.5, None, false).unwrap();
        assert_eq!(nbrs.edges, vec![[0, 1], [1, 2]]);
        assert!(!nbrs.directed);
    }

    #[test]
    fn test_symmetrize_undirected() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let nbrs = build_neighbor_list(&positions, 1.5, None, false).unwrap();
        let directed = nbrs.symmetrize();
        assert!(directed.directed);
        assert_eq!(directed.edges, vec![[0, 1], [1, 0]]);
    }

    #[test]
    fn test_invalid_cutoff() {
        let positions = [[0.0; 3]];
        assert!(matches!(
            build_neighbor_list(&positions, -1.0, None, true),
            Err(OxidyneError::InvalidParameter(_))
        ));
        assert!(matches!(
            build_neighbor_list(&positions, f64::NAN, None, true),
            Err(OxidyneError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_cell_too_small_rejected() {
        let cell = Cell::orthorhombic([3.0, 20.0, 20.0]).unwrap();
        let positions = [[0.0; 3], [1.0, 0.0, 0.0]];
        assert!(matches!(
            build_neighbor_list(&positions, 2.0, Some(&cell), true),
            Err(OxidyneError::CutoffTooLarge { .. })
        ));
    }

    #[test]
    fn test_zero_atoms() {
        let nbrs = build_neighbor_list(&[], 2.0, None, true).unwrap();
        assert!(nbrs.is_empty());
    }
}
