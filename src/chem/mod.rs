//! Chemistry lookup tables

pub mod elements;
pub mod masses;
