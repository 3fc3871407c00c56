pub mod error;
pub mod params;
pub mod particle;
pub mod quadtree;
pub mod region;
pub mod simulation;
pub mod utils;
pub mod vector;

pub use error::{Error, Insertion, Rejection};
pub use params::TreeParams;
pub use particle::Particle;
pub use quadtree::{InsertionSummary, Node, NodeId, NodeKind, SpatialTree, direct_forces, pairwise_force};
pub use region::{Quadrant, Region};
pub use simulation::{RegionPolicy, Simulation, apply_forces};
pub use vector::Vector;
