//! Root/order search driver, its error type and the flattened output.
pub mod error;
pub mod output;
pub mod search;

pub use error::AlignmentError;
pub use output::AlignmentOutput;
pub use search::{AlignmentEngine, CancelToken};
