use std::fmt;

use crate::vector::{Show, Vector};

/// A point mass moving in the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Mass of the particle.
    pub mass: f64,
    /// Position vector.
    pub position: Vector,
    /// Velocity vector.
    pub velocity: Vector,
    /// Position before the last integration step, kept for drawing trails.
    pub last_position: Vector,
}

impl Particle {
    pub fn new(mass: f64, position: Vector, velocity: Vector) -> Self {
        Self {
            mass,
            position,
            velocity,
            last_position: position,
        }
    }

    pub fn at_rest(mass: f64, position: Vector) -> Self {
        Self::new(mass, position, Vector::zero())
    }

    pub fn momentum(&self) -> Vector {
        self.velocity * self.mass
    }

    /// Advances the particle by `dt` under `force` with explicit Euler:
    /// the velocity is updated from the old acceleration, then the position
    /// from the new velocity.
    ///
    /// A massless particle is not accelerated.
    pub fn integrate(&mut self, force: Vector, dt: f64) {
        let acceleration = if self.mass > 0.0 {
            force / self.mass
        } else {
            Vector::zero()
        };
        self.last_position = self.position;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mass: {} position: {} velocity: {}",
            self.mass,
            Show(self.position),
            Show(self.velocity)
        )
    }
}
