//! Molecular dynamics drivers

pub mod tully;
pub mod verlet;
