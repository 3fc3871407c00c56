use std::error;
use std::fmt;

use crate::vector::{Show, Vector};

/// Errors raised by the tree and the step driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Region corners are unordered or not finite.
    InvalidRegion { min: Vector, max: Vector },
    /// A bounding region was requested for an empty particle set.
    EmptyRegion,
    /// Force query issued after the tree changed without a new aggregation pass.
    NotAggregated,
    /// The force slice does not line up with the particle slice.
    ForceCountMismatch { particles: usize, forces: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRegion { min, max } => write!(
                f,
                "Invalid region: min corner {} is not below max corner {}",
                Show(*min),
                Show(*max)
            ),
            Error::EmptyRegion => write!(f, "Cannot bound an empty set of particles"),
            Error::NotAggregated => write!(f, "Tree must be aggregated before querying forces"),
            Error::ForceCountMismatch { particles, forces } => write!(
                f,
                "Force count mismatch: {} particles but {} forces",
                particles, forces
            ),
        }
    }
}

impl error::Error for Error {}

/// Why an insertion left the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutsideRegion,
}

/// Outcome of inserting one particle into a [`SpatialTree`](crate::SpatialTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The particle got its own leaf.
    Inserted,
    /// The particle was folded into an existing leaf (coincident position or
    /// maximum depth reached).
    Merged,
    Rejected(Rejection),
}

impl Insertion {
    pub fn is_stored(&self) -> bool {
        !matches!(self, Insertion::Rejected(_))
    }
}
