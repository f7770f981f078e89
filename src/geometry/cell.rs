//! Orthorhombic periodic cells and the minimum-image convention
//!
//! The per-axis minimum-image reduction implemented here is only exact for
//! orthorhombic cells with the cutoff below half the shortest cell length.
//! General triclinic cells would need a full lattice reduction and are
//! rejected at construction time.

use crate::error::{OxidyneError, Result};

/// An orthorhombic periodic cell, stored as its three edge lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    lengths: [f64; 3],
}

impl Cell {
    /// Build from edge lengths. Each length must be positive.
    pub fn orthorhombic(lengths: [f64; 3]) -> Result<Self> {
        for (axis, &len) in lengths.iter().enumerate() {
            if !(len > 0.0) {
                return Err(OxidyneError::InvalidParameter(format!(
                    "cell length {len} on axis {axis} must be positive"
                )));
            }
        }
        Ok(Self { lengths })
    }

    /// Build from a general 3x3 row-vector matrix.
    ///
    /// Off-diagonal elements must be zero: triclinic cells are not supported
    /// by the per-axis minimum-image reduction.
    pub fn from_matrix(matrix: &[[f64; 3]; 3]) -> Result<Self> {
        for i in 0..3 {
            for j in 0..3 {
                if i != j && matrix[i][j].abs() > 1e-10 {
                    return Err(OxidyneError::InvalidParameter(
                        "non-orthorhombic cells are not supported".to_string(),
                    ));
                }
            }
        }
        Self::orthorhombic([matrix[0][0], matrix[1][1], matrix[2][2]])
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    /// Verify that every axis can accommodate the cutoff.
    ///
    /// Any axis shorter than twice the cutoff makes the minimum-image
    /// approximation under-count neighbors, so it is rejected outright.
    pub fn check_cutoff(&self, cutoff: f64) -> Result<()> {
        for (axis, &length) in self.lengths.iter().enumerate() {
            if length < 2.0 * cutoff {
                return Err(OxidyneError::CutoffTooLarge {
                    cutoff,
                    axis,
                    length,
                });
            }
        }
        Ok(())
    }

    /// Apply the minimum-image convention to a raw displacement.
    ///
    /// Returns the corrected displacement together with the Cartesian
    /// translation (`offset`) that was added to it. Adding `offset` to the
    /// second atom's position aligns it with its nearest periodic image.
    pub fn min_image(&self, disp: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        let mut corrected = disp;
        let mut offset = [0.0; 3];
        for axis in 0..3 {
            let len = self.lengths[axis];
            if corrected[axis] >= 0.5 * len {
                corrected[axis] -= len;
                offset[axis] = -len;
            } else if corrected[axis] < -0.5 * len {
                corrected[axis] += len;
                offset[axis] = len;
            }
        }
        (corrected, offset)
    }
}
