//! Dependency resolution: who owns the resource a thread is waiting on
//!
//! See [`resolver`] for the algorithm.

pub mod resolver;

pub use resolver::{resolve, split_composite, validate, OwnerResolution};
