//! Atomic mass assignment utilities
//!
//! Masses are keyed by atomic number and returned in amu.

/// Default mass for elements not in the table
pub const DEFAULT_MASS: f64 = 12.011;

/// Get the atomic mass (amu) for an atomic number
pub fn mass_for_z(z: u8) -> f64 {
    match z {
        1 => 1.008,
        3 => 6.941,
        5 => 10.811,
        6 => 12.011,
        7 => 14.007,
        8 => 15.999,
        9 => 18.998,
        10 => 20.180,
        11 => 22.990,
        12 => 24.305,
        14 => 28.086,
        15 => 30.974,
        16 => 32.06,
        17 => 35.45,
        18 => 39.948,
        19 => 39.098,
        20 => 40.078,
        26 => 55.845,
        29 => 63.546,
        30 => 65.38,
        35 => 79.904,
        53 => 126.90,
        _ => DEFAULT_MASS,
    }
}

/// Assign masses for a sequence of atomic numbers
pub fn masses_for(numbers: &[u8]) -> Vec<f64> {
    numbers.iter().map(|&z| mass_for_z(z)).collect()
}
