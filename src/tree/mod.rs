//! Tree Adapter and the rooted binary views built on top of it.
pub mod binary;
pub mod contour;
pub mod source;

pub use binary::{BinaryView, RootingError, ViewId, ViewKind, ViewNode};
pub use contour::{ContourTree, CtArc, CtNode, TreeInput};
pub use source::{ArcMeasures, Neighbours, TreeSource};
