//! The consensus alignment graph and the merge step that grows it.
pub mod edge;
pub mod merge;
pub mod node;
pub mod storage;

pub use edge::AlignmentEdge;
pub use merge::ConsensusMerger;
pub use node::AlignmentNode;
pub use storage::ConsensusGraph;
