//! Pairwise alignment of two binary views: cost model, memoized DP and traceback.
pub mod aligner;
pub mod cost;
pub mod trace;

pub use aligner::{ForestStep, PairwiseAligner, TreeStep};
pub use cost::{CostModel, NO_MATCH};
pub use trace::{Pairing, TraceNode, Tracer};

use crate::tree::BinaryView;

/// Result of aligning two binary views.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseAlignment {
    pub cost: f64,
    pub trace: TraceNode,
}

/// Aligns `left` against `right` and traces one optimal alignment.
pub fn align_pair(left: &BinaryView, right: &BinaryView, cost: CostModel) -> PairwiseAlignment {
    let mut aligner = PairwiseAligner::new(left, right, cost);
    let cost = aligner.align();
    let trace = Tracer::new(&mut aligner).trace();
    PairwiseAlignment { cost, trace }
}
