use std::fmt;

use crate::error::Error;
use crate::particle::Particle;
use crate::vector::{Show, Vector};

/// One of the four cells a region splits into.
#[repr(usize)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthEast = 2,
    SouthWest = 3,
}

impl Quadrant {
    /// Quadrants in child slot order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
    ];

    /// Slot index of this quadrant in a node's children array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::NorthWest => "nw",
            Quadrant::NorthEast => "ne",
            Quadrant::SouthEast => "se",
            Quadrant::SouthWest => "sw",
        }
    }
}

/// Axis-aligned rectangle with a precomputed center.
/// Boundaries belong to the region on every side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    min: Vector,
    max: Vector,
    center: Vector,
}

impl Region {
    /// Creates a region from its lower-left and upper-right corners.
    pub fn new(min: Vector, max: Vector) -> Result<Self, Error> {
        let span = max - min;
        let finite = span.x.is_finite() && span.y.is_finite();
        if !finite || min.x > max.x || min.y > max.y {
            return Err(Error::InvalidRegion { min, max });
        }
        Ok(Self::new_unchecked(min, max))
    }

    /// Creates a region from any two opposite corners.
    pub fn from_corners(a: Vector, b: Vector) -> Result<Self, Error> {
        Self::new(a.min_by_component(b), a.max_by_component(b))
    }

    fn new_unchecked(min: Vector, max: Vector) -> Self {
        Self {
            min,
            max,
            center: min + (max - min) * 0.5,
        }
    }

    /// Smallest square region, centered on the bounding box, that holds every particle.
    pub fn bounding(particles: &[Particle]) -> Result<Self, Error> {
        let first = particles.first().ok_or(Error::EmptyRegion)?;
        let (mut min, mut max) = (first.position, first.position);
        for particle in &particles[1..] {
            min = min.min_by_component(particle.position);
            max = max.max_by_component(particle.position);
        }

        let center = (min + max) * 0.5;
        let half = (max.x - min.x).max(max.y - min.y) * 0.5;
        let half = Vector::broadcast(half);
        // rounding in center +- half must not cut off the extreme particles
        Self::new((center - half).min_by_component(min), (center + half).max_by_component(max))
    }

    pub fn min_corner(&self) -> Vector {
        self.min
    }

    pub fn max_corner(&self) -> Vector {
        self.max
    }

    pub fn center(&self) -> Vector {
        self.center
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Size proxy used by the opening-angle test.
    pub fn size(&self) -> f64 {
        self.width().max(self.height())
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains(&self, p: Vector) -> bool {
        self.min.x <= p.x && p.x <= self.max.x && self.min.y <= p.y && p.y <= self.max.y
    }

    /// Finds the quadrant holding `p`, or `None` when `p` lies outside the region.
    ///
    /// Points on a center line match several quadrants; ties are broken in the
    /// order NW, NE, SW, SE.
    pub fn classify(&self, p: Vector) -> Option<Quadrant> {
        if !self.contains(p) {
            return None;
        }
        let north = p.y >= self.center.y;
        let south = p.y <= self.center.y;
        let west = p.x <= self.center.x;
        let east = p.x >= self.center.x;

        if north && west {
            Some(Quadrant::NorthWest)
        } else if north && east {
            Some(Quadrant::NorthEast)
        } else if south && west {
            Some(Quadrant::SouthWest)
        } else if south && east {
            Some(Quadrant::SouthEast)
        } else {
            // NaN coordinates fail every comparison.
            None
        }
    }

    /// The quarter of this region covered by `quadrant`.
    pub fn subregion(&self, quadrant: Quadrant) -> Self {
        let (min, max, c) = (self.min, self.max, self.center);
        match quadrant {
            Quadrant::NorthWest => Self::new_unchecked(Vector::new(min.x, c.y), Vector::new(c.x, max.y)),
            Quadrant::NorthEast => Self::new_unchecked(c, max),
            Quadrant::SouthEast => Self::new_unchecked(Vector::new(c.x, min.y), Vector::new(max.x, c.y)),
            Quadrant::SouthWest => Self::new_unchecked(min, c),
        }
    }

    /// Divides the region into its four quadrants, in slot order.
    pub fn subdivide(&self) -> [Region; 4] {
        Quadrant::ALL.map(|q| self.subregion(q))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min_corner: {} max_corner: {}", Show(self.min), Show(self.max))
    }
}
