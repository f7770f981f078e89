//! Trajectory output formats

pub mod xyz;
