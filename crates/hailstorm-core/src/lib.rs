//! Core types and definitions for the Hailstorm simulation.
//!
//! This crate defines the vocabulary shared across the engine:
//! component types, archetype templates, spawn configuration, and
//! constants. It has no runtime machinery, no RNG, and no I/O.

pub mod archetype;
pub mod components;
pub mod constants;
pub mod spawn;
pub mod types;
