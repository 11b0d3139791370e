//! Alignment of contour-tree ensembles into one consensus graph.
//!
//! Each input tree is adapted from flat per-tree arrays, the trees are merged
//! one by one into a consensus graph through pairwise tree edit alignment, and
//! the cheapest root choice wins. The winning graph is branch-decomposed and
//! returned as flat arrays.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod engine;
pub mod graph;
pub mod report;
pub mod store;
pub mod tree;

pub use compute::{align_pair, CostModel, PairwiseAlignment};
pub use config::{AggregationPolicy, AlignmentConfig, ArcMatchMode};
pub use engine::{AlignmentEngine, AlignmentError, AlignmentOutput, CancelToken};
pub use report::{CapturingReporter, LogReporter, Reporter};
pub use tree::{BinaryView, ContourTree, TreeInput};

/// Runs the engine over `inputs`, reporting through the `log` facade.
pub fn align_ensemble(inputs: &[TreeInput], config: AlignmentConfig) -> Result<AlignmentOutput, AlignmentError> {
    AlignmentEngine::new(config, &LogReporter)?.run(inputs)
}
