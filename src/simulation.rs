use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    error::Error,
    params::TreeParams,
    particle::Particle,
    quadtree::{InsertionSummary, SpatialTree},
    region::Region,
    vector::Vector,
};

/// How the tree region is chosen at the start of every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegionPolicy {
    /// The same region every step. Particles that leave it stop acting as
    /// sources until they come back.
    Fixed(Region),
    /// The bounding square of the current particle positions.
    Bounding,
}

/// Drives the Barnes-Hut step: rebuild the tree, query forces, integrate.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Time step per frame.
    pub dt: f64,
    /// Current frame count.
    pub frame: usize,
    /// Collection of all bodies in the simulation.
    pub particles: Vec<Particle>,
    pub region: RegionPolicy,
    pub params: TreeParams,
    /// Whether force queries and integration run on the rayon pool.
    pub use_rayon: bool,
}

impl Simulation {
    pub const DEFAULT_DT: f64 = 0.05;

    /// A simulation over the bounding region of `particles` with default parameters.
    pub fn new(particles: Vec<Particle>) -> Self {
        Self::with_params(particles, Self::DEFAULT_DT, RegionPolicy::Bounding, TreeParams::default())
    }

    pub fn with_params(particles: Vec<Particle>, dt: f64, region: RegionPolicy, params: TreeParams) -> Self {
        Self {
            dt,
            frame: 0,
            particles,
            region,
            params,
            use_rayon: true,
        }
    }

    pub fn set_use_rayon(&mut self, use_rayon: bool) {
        self.use_rayon = use_rayon;
    }

    /// Region the next tree will be built over.
    pub fn current_region(&self) -> Result<Region, Error> {
        match self.region {
            RegionPolicy::Fixed(region) => Ok(region),
            RegionPolicy::Bounding => Region::bounding(&self.particles),
        }
    }

    /// Advances the simulation by one step.
    pub fn step(&mut self) -> Result<InsertionSummary, Error> {
        if self.particles.is_empty() {
            self.frame += 1;
            return Ok(InsertionSummary::default());
        }

        let (forces, summary) = self.attract()?;
        self.integrate(&forces)?;
        self.frame += 1;
        Ok(summary)
    }

    /// Builds this step's tree and returns the force on every particle.
    /// Particles rejected by the tree still feel the force of the others.
    pub fn attract(&self) -> Result<(Vec<Vector>, InsertionSummary), Error> {
        let mut tree = SpatialTree::new(self.current_region()?, self.params);
        let summary = tree.insert_all(self.particles.iter().copied());
        if summary.rejected > 0 {
            warn!(
                "frame {}: {} of {} particles lie outside {}",
                self.frame,
                summary.rejected,
                self.particles.len(),
                tree.region()
            );
        }
        tree.aggregate();
        debug!(
            "frame {}: {} particles, {} nodes, depth {:?}",
            self.frame,
            self.particles.len(),
            tree.node_count(),
            tree.depth()
        );

        let forces = if self.use_rayon {
            tree.forces(&self.particles)?
        } else {
            tree.forces_sequential(&self.particles)?
        };
        Ok((forces, summary))
    }

    /// Applies one force per particle over `dt`.
    pub fn integrate(&mut self, forces: &[Vector]) -> Result<(), Error> {
        if !self.use_rayon {
            return apply_forces(&mut self.particles, forces, self.dt);
        }
        check_lengths(&self.particles, forces)?;
        let dt = self.dt;
        self.particles
            .par_iter_mut()
            .zip(forces.par_iter())
            .for_each(|(particle, force)| particle.integrate(*force, dt));
        Ok(())
    }

    /// Drops particles that left a fixed region. Returns how many were removed.
    pub fn remove_outside(&mut self) -> usize {
        let RegionPolicy::Fixed(region) = self.region else {
            return 0;
        };
        let before = self.particles.len();
        self.particles.retain(|p| region.contains(p.position));
        let removed = before - self.particles.len();
        if removed > 0 {
            debug!("removed {} particles outside {}", removed, region);
        }
        removed
    }

    pub fn total_mass(&self) -> f64 {
        self.particles.iter().map(|p| p.mass).sum()
    }

    pub fn total_momentum(&self) -> Vector {
        self.particles.iter().fold(Vector::zero(), |acc, p| acc + p.momentum())
    }
}

/// Integrates every particle with its matching force. Fails when the two
/// slices are not the same length.
pub fn apply_forces(particles: &mut [Particle], forces: &[Vector], dt: f64) -> Result<(), Error> {
    check_lengths(particles, forces)?;
    for (particle, force) in particles.iter_mut().zip(forces) {
        particle.integrate(*force, dt);
    }
    Ok(())
}

fn check_lengths(particles: &[Particle], forces: &[Vector]) -> Result<(), Error> {
    if particles.len() != forces.len() {
        return Err(Error::ForceCountMismatch {
            particles: particles.len(),
            forces: forces.len(),
        });
    }
    Ok(())
}
