//! Geometric primitives: periodic cells, neighbor lists, and triplet indices

pub mod cell;
pub mod neighbors;
pub mod triplets;
