//! Physical constants and unit conversions for force-field computations
//!
//! Energies are carried in kcal/mol, distances in Angstroms, and masses in
//! amu unless a function documents otherwise. All values are f64: the whole
//! crate runs in a single floating-point precision to avoid the subtle
//! divergence that mixed-precision accumulation introduces.

/// Hartree to kcal/mol
pub const HARTREE_TO_KCAL_MOL: f64 = 627.509;

/// eV to kcal/mol
pub const EV_TO_KCAL_MOL: f64 = 23.06052;

/// Bohr radius in Angstroms
pub const BOHR_RADIUS: f64 = 0.529177;

/// Boltzmann constant in kcal/(mol K)
pub const BOLTZMANN_KCAL: f64 = 0.0019872;

/// Reduced Planck constant in atomic units
pub const HBAR_AU: f64 = 1.0;

/// Minimum distance guard against division by zero (Angstroms)
pub const MIN_DISTANCE: f64 = 1e-7;

/// Minimum vector norm below which a direction is treated as undefined
pub const MIN_NORM: f64 = 1e-12;
