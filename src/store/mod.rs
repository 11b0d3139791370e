//! Dense index types and the small value types shared by every stage.
pub mod types;

pub use types::{EdgeId, NodeId, NodeType, TreeRef};
