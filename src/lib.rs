//! Oxidyne — neural force-field core library
//!
//! Provides the numeric backbone for graph-neural-network potentials driving
//! molecular dynamics:
//!
//! - `geometry` — neighbor lists with minimum-image periodic handling, and
//!   triplet (angle) index derivation for angular message passing
//! - `graph` — batching of independent systems into one reindexed super-graph
//! - `grad` — reverse-mode automatic differentiation of scalar energies,
//!   forces as negative gradients, and per-system batched Hessians
//! - `dynamics` — velocity-Verlet MD and Tully fewest-switches surface hopping
//!
//! The neural network forward pass itself is an external collaborator: any
//! type implementing [`EnergyModel`] can drive the force pipeline and the
//! integrators.

pub mod chem;
pub mod constants;
pub mod dynamics;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod grad;
pub mod graph;
pub mod potential;
pub mod structure;

pub use error::{OxidyneError, Result};
pub use geometry::cell::Cell;
pub use geometry::neighbors::{build_neighbor_list, NeighborList};
pub use geometry::triplets::{derive_triplets, TripletList};
pub use grad::forces::{compute_forces, EnergyModel, TrackedCoords};
pub use grad::tape::{Tape, Var};
pub use graph::batch::{build_batch, collate, GraphBatch, SystemGraph};
pub use structure::Geometry;
