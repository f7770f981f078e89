//! Error types shared across the crate
//!
//! Parameter-validation errors are raised at the boundary of the offending
//! component; numerical oddities inside the integrators (NaN couplings) are
//! handled locally and never surface as errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OxidyneError {
    /// Non-physical or out-of-range configuration
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Periodic cell too small for the minimum-image convention at this cutoff
    #[error("cutoff {cutoff} exceeds half the cell length {length} on axis {axis}")]
    CutoffTooLarge {
        cutoff: f64,
        axis: usize,
        length: f64,
    },

    /// The coordinate tensor was not registered on the tape
    #[error("coordinate tensor does not have gradient tracking enabled")]
    GradientNotEnabled,

    /// The energy was not computed through the coordinate tensor
    #[error("no differentiable path from energy to coordinates")]
    NoGradientPath,

    /// A neighbor list of the wrong directed/undirected convention was supplied
    #[error("expected {expected} neighbor list")]
    DirectednessMismatch { expected: &'static str },

    /// Trajectory output failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OxidyneError>;
