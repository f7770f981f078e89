//! Extended-XYZ trajectory output
//!
//! One frame is an atom count line, a comment line, then one
//! `symbol x y z` line per atom. Concatenated frames form a trajectory any
//! standard viewer can play back.

use std::io::Write;

use crate::chem::elements::symbol_for_z;
use crate::error::{OxidyneError, Result};

/// Write one frame. The comment must not contain a newline.
pub fn write_frame<W: Write>(
    out: &mut W,
    atomic_numbers: &[u8],
    positions: &[[f64; 3]],
    comment: &str,
) -> Result<()> {
    if atomic_numbers.len() != positions.len() {
        return Err(OxidyneError::InvalidParameter(format!(
            "{} atomic numbers for {} positions",
            atomic_numbers.len(),
            positions.len()
        )));
    }
    if comment.contains('\n') {
        return Err(OxidyneError::InvalidParameter(
            "frame comment must be a single line".to_string(),
        ));
    }

    writeln!(out, "{}", positions.len())?;
    writeln!(out, "{comment}")?;
    for (&z, p) in atomic_numbers.iter().zip(positions) {
        writeln!(
            out,
            "{} {:.8} {:.8} {:.8}",
            symbol_for_z(z),
            p[0],
            p[1],
            p[2]
        )?;
    }
    Ok(())
}

/// In-memory frame accumulator, flushed to a writer in one go.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    frames: Vec<(Vec<u8>, Vec<[f64; 3]>, String)>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, atomic_numbers: &[u8], positions: &[[f64; 3]], comment: &str) {
        self.frames.push((
            atomic_numbers.to_vec(),
            positions.to_vec(),
            comment.to_string(),
        ));
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        for (numbers, positions, comment) in &self.frames {
            write_frame(out, numbers, positions, comment)?;
        }
        Ok(())
    }
}
