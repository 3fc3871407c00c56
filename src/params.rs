/// Tuning knobs for tree construction and the force walk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeParams {
    /// Opening angle. Cells seen under a size/distance ratio at or below this
    /// value are treated as a single point mass. Zero gives exact summation.
    pub theta: f64,
    /// Point masses closer than this contribute no force.
    pub softening: f64,
    /// Gravitational constant.
    pub gravitational_constant: f64,
    /// Deepest level a leaf may be split to. Bodies that still share a cell
    /// at this depth are merged.
    pub max_depth: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THETA, Self::DEFAULT_SOFTENING)
    }
}

impl TreeParams {
    pub const DEFAULT_THETA: f64 = 0.5;
    pub const DEFAULT_SOFTENING: f64 = 1.0e-6;
    /// SI value, m^3 kg^-1 s^-2.
    pub const DEFAULT_G: f64 = 6.674e-11;
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    pub fn new(theta: f64, softening: f64) -> Self {
        Self {
            theta,
            softening,
            gravitational_constant: Self::DEFAULT_G,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Exact pairwise summation (theta = 0).
    pub fn exact() -> Self {
        Self::default().with_theta(0.0)
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_softening(mut self, softening: f64) -> Self {
        self.softening = softening;
        self
    }

    pub fn with_gravitational_constant(mut self, g: f64) -> Self {
        self.gravitational_constant = g;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
