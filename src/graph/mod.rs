//! Batched super-graph construction and ragged batch bookkeeping

pub mod batch;
pub mod ragged;
