//! The read-only view both the input trees and the consensus graph expose
//! to the rooting helpers.

use crate::config::ArcMatchMode;
use crate::store::NodeType;
use smallvec::SmallVec;

/// Size measures of one arc.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArcMeasures {
    pub persistence: f64,
    pub area: f64,
    pub volume: f64,
}

impl ArcMeasures {
    #[inline(always)]
    pub fn get(&self, mode: ArcMatchMode) -> f64 {
        match mode {
            ArcMatchMode::Persistence => self.persistence,
            ArcMatchMode::Area => self.area,
            ArcMatchMode::Volume => self.volume,
        }
    }
}

/// `(arc, neighbour)` pairs incident to one node, in adjacency order.
pub type Neighbours = SmallVec<[(usize, usize); 3]>;

pub trait TreeSource {
    fn node_count(&self) -> usize;
    fn arc_count(&self) -> usize;
    fn node_type(&self, node: usize) -> NodeType;
    fn node_scalar(&self, node: usize) -> f64;
    fn neighbours(&self, node: usize) -> Neighbours;
    fn arc_ends(&self, arc: usize) -> (usize, usize);
    fn arc_measures(&self, arc: usize) -> ArcMeasures;
}
