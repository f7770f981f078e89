//! Reverse-mode differentiation and the energy-to-force pipeline

pub mod forces;
pub mod hessian;
pub mod tape;
