use crate::tree::RootingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("Tree {tree}: declared {declared} vertices but the arcs realize {realized}")]
    ConstructionMismatch { tree: usize, declared: usize, realized: usize },
    #[error("Tree {tree}: `{field}` holds {actual} entries, expected {expected}")]
    InputLength { tree: usize, field: &'static str, expected: usize, actual: usize },
    #[error("Tree {tree}: vertex {vertex} has a non-finite scalar value")]
    NonFiniteScalar { tree: usize, vertex: usize },
    #[error("No input tree is binary")]
    NoBinaryInput,
    #[error("No root candidate produced an alignment")]
    NoValidRoot,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Midpoint views cannot be merged into the consensus graph")]
    UnmergeableView,
    #[error("Alignment cancelled")]
    Cancelled,
    #[error("Rooting failed: {0}")]
    Rooting(#[from] RootingError),
}
