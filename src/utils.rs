use crate::particle::Particle;
use crate::vector::Vector;

/// Generates `n` bodies distributed in a uniform disc around a heavy central body.
/// - The central body has mass `1e6`, every other body mass `1`.
/// - Bodies are placed at random angles with uniform area density.
/// - Velocities are set for circular orbits around the mass enclosed by each
///   body's radius, with the gravitational constant `g`.
pub fn uniform_disc(n: usize, g: f64) -> Vec<Particle> {
    let mut rng = fastrand::Rng::with_seed(0);
    let inner_radius = 25.0;
    let outer_radius = (n as f64).sqrt() * 5.0;

    let mut bodies: Vec<Particle> = Vec::with_capacity(n);
    if n == 0 {
        return bodies;
    }
    bodies.push(Particle::at_rest(1e6, Vector::zero()));

    while bodies.len() < n {
        let a = rng.f64() * std::f64::consts::TAU;
        let (sin, cos) = a.sin_cos();

        // uniform in area between the inner and outer radius
        let t = inner_radius / outer_radius;
        let r = rng.f64() * (1.0 - t * t) + t * t;
        let pos = Vector::new(cos, sin) * outer_radius * r.sqrt();

        // unit tangent, scaled below
        let vel = Vector::new(sin, -cos);
        bodies.push(Particle::new(1.0, pos, vel));
    }

    bodies.sort_by(|a, b| a.position.mag_sq().total_cmp(&b.position.mag_sq()));

    // v = sqrt(G M / r)
    let mut mass = 0.0;
    for body in &mut bodies {
        mass += body.mass;
        if body.position == Vector::zero() {
            continue;
        }
        let v = (g * mass / body.position.mag()).sqrt();
        body.velocity *= v;
    }

    bodies
}

/// A central mass with four bodies on clockwise circular orbits at `distance`,
/// one in each compass direction.
pub fn four_orbiters(central_mass: f64, mass: f64, distance: f64, g: f64) -> Vec<Particle> {
    let speed = (g * (central_mass + mass) / distance).sqrt();
    let east = Vector::new(1.0, 0.0);
    let north = Vector::new(0.0, 1.0);

    let mut bodies = vec![Particle::at_rest(central_mass, Vector::zero())];
    for (pos, vel) in [
        (east, -north),
        (-north, -east),
        (-east, north),
        (north, east),
    ] {
        bodies.push(Particle::new(mass, pos * distance, vel * speed));
    }
    bodies
}

/// A heavy central body (mass `1e7`) and `n` bodies of mass `1e4` on a ring
/// between radius 500 and 1000.
///
/// Each ring body moves at three quarters of its circular speed, heading 45
/// degrees off its radius, so every orbit is bound and eccentric and the ring
/// collapses towards the center after its first swing outward.
pub fn collapsing_ring(n: usize, g: f64) -> Vec<Particle> {
    let mut rng = fastrand::Rng::with_seed(0);
    let central_mass = 1e7;
    let mass = 1e4;

    let mut bodies = Vec::with_capacity(n + 1);
    bodies.push(Particle::at_rest(central_mass, Vector::zero()));
    for _ in 0..n {
        let r = 500.0 + rng.f64() * 500.0;
        let a = rng.f64() * std::f64::consts::TAU;
        let heading = a + std::f64::consts::FRAC_PI_4;

        let speed = 0.75 * (g * (central_mass + mass) / r).sqrt();
        let (sin, cos) = a.sin_cos();
        let (vsin, vcos) = heading.sin_cos();
        bodies.push(Particle::new(
            mass,
            Vector::new(cos, sin) * r,
            Vector::new(vcos, vsin) * speed,
        ));
    }
    bodies
}
