use std::fmt;

/// 2D vector used for positions, velocities and forces.
pub type Vector = ultraviolet::DVec2;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: Vector, b: Vector) -> f64 {
    (a - b).mag()
}

/// Displays a vector as `(x, y)`.
pub struct Show(pub Vector);

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0.x, self.0.y)
    }
}
