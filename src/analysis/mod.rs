//! Post-processing of the winning consensus graph.
pub mod branches;

pub use branches::decompose;
