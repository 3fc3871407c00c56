use std::fmt;

use log::{debug, trace};
use rayon::prelude::*;

use crate::error::{Error, Insertion, Rejection};
use crate::params::TreeParams;
use crate::particle::Particle;
use crate::region::{Quadrant, Region};
use crate::vector::{Show, Vector, distance};

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// Holds exactly one body and no children.
    Leaf { particle: Particle },
    /// Stands in for every body below it. `mass` and `centroid` are only
    /// meaningful after [`SpatialTree::aggregate`].
    Conglomerate {
        mass: f64,
        centroid: Vector,
        children: [Option<NodeId>; 4],
    },
}

/// One cell of the quadtree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub region: Region,
    /// Number of subdivisions between the root and this cell.
    pub depth: usize,
    pub kind: NodeKind,
}

impl Node {
    fn leaf(region: Region, depth: usize, particle: Particle) -> Self {
        Self {
            region,
            depth,
            kind: NodeKind::Leaf { particle },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Mass of the body (leaf) or of the aggregate (conglomerate).
    pub fn mass(&self) -> f64 {
        match self.kind {
            NodeKind::Leaf { particle } => particle.mass,
            NodeKind::Conglomerate { mass, .. } => mass,
        }
    }

    /// Position of the body (leaf) or center of mass (conglomerate).
    pub fn position(&self) -> Vector {
        match self.kind {
            NodeKind::Leaf { particle } => particle.position,
            NodeKind::Conglomerate { centroid, .. } => centroid,
        }
    }

    /// Child slots in quadrant order. Always empty for leaves.
    pub fn children(&self) -> [Option<NodeId>; 4] {
        match self.kind {
            NodeKind::Leaf { .. } => [None; 4],
            NodeKind::Conglomerate { children, .. } => children,
        }
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<NodeId> {
        self.children()[quadrant.index()]
    }
}

/// Tally of a batch insertion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertionSummary {
    pub inserted: usize,
    pub merged: usize,
    pub rejected: usize,
}

impl InsertionSummary {
    fn record(&mut self, insertion: Insertion) {
        match insertion {
            Insertion::Inserted => self.inserted += 1,
            Insertion::Merged => self.merged += 1,
            Insertion::Rejected(_) => self.rejected += 1,
        }
    }
}

/// Barnes-Hut quadtree over a fixed region.
///
/// Nodes live in a flat arena; a child is always stored after its parent,
/// which lets aggregation run as a single reverse sweep.
#[derive(Clone, Debug)]
pub struct SpatialTree {
    region: Region,
    params: TreeParams,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    bodies: usize,
    /// False while the tree has changed since the last aggregation.
    aggregated: bool,
}

impl SpatialTree {
    pub fn new(region: Region, params: TreeParams) -> Self {
        Self {
            region,
            params,
            nodes: Vec::new(),
            root: None,
            bodies: 0,
            aggregated: true,
        }
    }

    pub fn with_region(region: Region) -> Self {
        Self::new(region, TreeParams::default())
    }

    /// Builds an aggregated tree from `particles`.
    pub fn build(region: Region, params: TreeParams, particles: &[Particle]) -> Self {
        let mut tree = Self::new(region, params);
        let summary = tree.insert_all(particles.iter().copied());
        debug!(
            "built tree: {} inserted, {} merged, {} rejected, {} nodes",
            summary.inserted,
            summary.merged,
            summary.rejected,
            tree.node_count()
        );
        tree.aggregate();
        tree
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of bodies accepted, merged ones included.
    pub fn len(&self) -> usize {
        self.bodies
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Depth of the deepest cell, `None` for an empty tree.
    pub fn depth(&self) -> Option<usize> {
        self.nodes.iter().map(|n| n.depth).max()
    }

    /// Bodies stored in leaves, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = &Particle> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Leaf { particle } => Some(particle),
            NodeKind::Conglomerate { .. } => None,
        })
    }

    /// Mass of the root cell. Only valid after aggregation.
    pub fn total_mass(&self) -> f64 {
        self.root.map_or(0.0, |root| self.node(root).mass())
    }

    /// Center of mass of the root cell. Only valid after aggregation.
    pub fn center_of_mass(&self) -> Option<Vector> {
        self.root.map(|root| self.node(root).position())
    }

    /// Drops every node. Region and parameters are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.bodies = 0;
        self.aggregated = true;
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Inserts a copy of `particle` into the tree.
    ///
    /// Particles outside the tree region are rejected and leave the tree
    /// unchanged.
    pub fn insert(&mut self, particle: Particle) -> Insertion {
        if !self.region.contains(particle.position) {
            debug!(
                "rejecting particle at {} outside {}",
                Show(particle.position),
                self.region
            );
            return Insertion::Rejected(Rejection::OutsideRegion);
        }

        let insertion = match self.root {
            None => {
                self.root = Some(self.push(Node::leaf(self.region, 0, particle)));
                Insertion::Inserted
            }
            Some(root) => self.insert_below(root, particle),
        };

        if insertion.is_stored() {
            self.bodies += 1;
            self.aggregated = false;
        }
        insertion
    }

    pub fn insert_all(&mut self, particles: impl IntoIterator<Item = Particle>) -> InsertionSummary {
        let mut summary = InsertionSummary::default();
        for particle in particles {
            summary.record(self.insert(particle));
        }
        summary
    }

    /// Walks down through conglomerates until an empty slot or a leaf is found.
    fn insert_below(&mut self, mut id: NodeId, particle: Particle) -> Insertion {
        loop {
            let node = self.nodes[id.0];
            let children = match node.kind {
                NodeKind::Leaf { particle: resident } => {
                    return self.split_leaf(id, resident, particle);
                }
                NodeKind::Conglomerate { children, .. } => children,
            };

            // Every cell on the path contains the position, so this only
            // fails for coordinates that compare false against everything.
            let Some(quadrant) = node.region.classify(particle.position) else {
                return Insertion::Rejected(Rejection::OutsideRegion);
            };

            match children[quadrant.index()] {
                Some(child) => id = child,
                None => {
                    let leaf = Node::leaf(node.region.subregion(quadrant), node.depth + 1, particle);
                    let child = self.push(leaf);
                    self.set_child(id, quadrant, child);
                    return Insertion::Inserted;
                }
            }
        }
    }

    fn set_child(&mut self, parent: NodeId, quadrant: Quadrant, child: NodeId) {
        if let NodeKind::Conglomerate { children, .. } = &mut self.nodes[parent.0].kind {
            children[quadrant.index()] = Some(child);
        }
    }

    /// Turns the leaf `id` into a conglomerate holding both `resident` and
    /// `incoming`, subdividing until they land in different quadrants.
    fn split_leaf(&mut self, mut id: NodeId, resident: Particle, incoming: Particle) -> Insertion {
        loop {
            let Node { region, depth, .. } = self.nodes[id.0];

            let quadrants = (
                region.classify(resident.position),
                region.classify(incoming.position),
            );
            let (Some(q_resident), Some(q_incoming)) = quadrants else {
                return self.merge_into(id, resident, incoming);
            };
            if resident.position == incoming.position || depth >= self.params.max_depth {
                return self.merge_into(id, resident, incoming);
            }

            let mut children = [None; 4];
            let resident_leaf = self.push(Node::leaf(region.subregion(q_resident), depth + 1, resident));
            children[q_resident.index()] = Some(resident_leaf);

            if q_resident == q_incoming {
                self.nodes[id.0].kind = conglomerate(region, children);
                id = resident_leaf;
                continue;
            }

            let incoming_leaf = self.push(Node::leaf(region.subregion(q_incoming), depth + 1, incoming));
            children[q_incoming.index()] = Some(incoming_leaf);
            self.nodes[id.0].kind = conglomerate(region, children);
            return Insertion::Inserted;
        }
    }

    fn merge_into(&mut self, id: NodeId, resident: Particle, incoming: Particle) -> Insertion {
        let node = &mut self.nodes[id.0];
        trace!(
            "merging body at {} into leaf at depth {}",
            Show(incoming.position),
            node.depth
        );
        node.kind = NodeKind::Leaf {
            particle: merge(resident, incoming),
        };
        Insertion::Merged
    }

    /// Computes the mass and center of mass of every conglomerate, children
    /// before parents.
    pub fn aggregate(&mut self) {
        for i in (0..self.nodes.len()).rev() {
            let NodeKind::Conglomerate { children, .. } = self.nodes[i].kind else {
                continue;
            };

            let mut mass = 0.0;
            let mut weighted = Vector::zero();
            for child in children.into_iter().flatten() {
                let child = &self.nodes[child.0];
                mass += child.mass();
                weighted += child.position() * child.mass();
            }

            let centroid = if mass > 0.0 {
                weighted / mass
            } else {
                self.nodes[i].region.center()
            };
            self.nodes[i].kind = NodeKind::Conglomerate {
                mass,
                centroid,
                children,
            };
        }
        self.aggregated = true;
        debug!(
            "aggregated {} nodes, total mass {}",
            self.nodes.len(),
            self.total_mass()
        );
    }

    /// Approximate gravitational force exerted by the tree on `target`.
    ///
    /// A conglomerate is used as a point mass when it is at least the
    /// softening length away and `size / distance <= theta`; otherwise its
    /// children are visited.
    pub fn force_on(&self, target: &Particle) -> Result<Vector, Error> {
        let Some(root) = self.root else {
            return Ok(Vector::zero());
        };
        if !self.aggregated {
            return Err(Error::NotAggregated);
        }

        let TreeParams {
            theta,
            softening,
            gravitational_constant: g,
            ..
        } = self.params;

        let mut force = Vector::zero();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            match &node.kind {
                NodeKind::Leaf { particle } => {
                    force += pairwise_force(target, particle.mass, particle.position, g, softening);
                }
                NodeKind::Conglomerate {
                    mass,
                    centroid,
                    children,
                } => {
                    let d = distance(target.position, *centroid);
                    if d >= softening && node.region.size() <= theta * d {
                        force += pairwise_force(target, *mass, *centroid, g, softening);
                    } else {
                        // reversed so that NW is visited first
                        stack.extend(children.iter().rev().flatten().copied());
                    }
                }
            }
        }
        Ok(force)
    }

    /// Force on each particle, in input order, evaluated in parallel.
    pub fn forces(&self, particles: &[Particle]) -> Result<Vec<Vector>, Error> {
        self.check_queryable()?;
        particles.par_iter().map(|p| self.force_on(p)).collect()
    }

    pub fn forces_sequential(&self, particles: &[Particle]) -> Result<Vec<Vector>, Error> {
        self.check_queryable()?;
        particles.iter().map(|p| self.force_on(p)).collect()
    }

    fn check_queryable(&self) -> Result<(), Error> {
        if self.root.is_some() && !self.aggregated {
            return Err(Error::NotAggregated);
        }
        Ok(())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let node = &self.nodes[id.0];
        let pad = "  ".repeat(indent);
        match node.kind {
            NodeKind::Leaf { particle } => {
                writeln!(f, "leaf {} : {}", particle, node.region)
            }
            NodeKind::Conglomerate {
                mass,
                centroid,
                children,
            } => {
                writeln!(
                    f,
                    "conglomerate mass: {} position: {} : {}",
                    mass,
                    Show(centroid),
                    node.region
                )?;
                for quadrant in Quadrant::ALL {
                    write!(f, "{}{}: ", pad, quadrant.label())?;
                    match children[quadrant.index()] {
                        Some(child) => self.fmt_node(f, child, indent + 1)?,
                        None => writeln!(f, "-")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Nested listing of every cell with its representative mass and region.
impl fmt::Display for SpatialTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root: {} : ", self.region)?;
        match self.root {
            None => writeln!(f, "-"),
            Some(root) => self.fmt_node(f, root, 1),
        }
    }
}

fn conglomerate(region: Region, children: [Option<NodeId>; 4]) -> NodeKind {
    NodeKind::Conglomerate {
        mass: 0.0,
        centroid: region.center(),
        children,
    }
}

/// Combines two bodies into one, conserving mass and momentum.
fn merge(a: Particle, b: Particle) -> Particle {
    let mass = a.mass + b.mass;
    if mass <= 0.0 {
        return Particle { mass, ..a };
    }
    Particle {
        mass,
        position: (a.position * a.mass + b.position * b.mass) / mass,
        velocity: (a.momentum() + b.momentum()) / mass,
        last_position: a.last_position,
    }
}

/// Newtonian force on `target` from a point mass, pointing towards the mass.
/// Zero when the two are closer than `softening`.
#[inline]
pub fn pairwise_force(target: &Particle, mass: f64, position: Vector, g: f64, softening: f64) -> Vector {
    let offset = position - target.position;
    let d = offset.mag();
    if d <= 0.0 || d < softening {
        return Vector::zero();
    }
    offset * (g * target.mass * mass / (d * d * d))
}

/// Exact O(n^2) summation over all other particles.
pub fn direct_forces(particles: &[Particle], params: &TreeParams) -> Vec<Vector> {
    particles
        .iter()
        .enumerate()
        .map(|(i, target)| {
            particles
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(Vector::zero(), |acc, (_, source)| {
                    acc + pairwise_force(
                        target,
                        source.mass,
                        source.position,
                        params.gravitational_constant,
                        params.softening,
                    )
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn region(half: f64) -> Region {
        Region::new(Vector::broadcast(-half), Vector::broadcast(half)).unwrap()
    }

    fn body(mass: f64, x: f64, y: f64) -> Particle {
        Particle::at_rest(mass, Vector::new(x, y))
    }

    fn unit_g() -> TreeParams {
        TreeParams::exact().with_gravitational_constant(1.0)
    }

    #[test]
    fn first_particle_becomes_root_leaf() {
        let mut tree = SpatialTree::with_region(region(10.0));
        let p = body(2.0, 1.0, -3.0);
        assert_eq!(tree.insert(p), Insertion::Inserted);

        let root = tree.node(tree.root().unwrap());
        assert_eq!(root.kind, NodeKind::Leaf { particle: p });
        assert_eq!(root.region, region(10.0));
        assert_eq!(root.depth, 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn out_of_region_particles_are_rejected() {
        let mut tree = SpatialTree::with_region(region(10.0));
        let outcome = tree.insert(body(1.0, 20.0, 0.0));
        assert_eq!(outcome, Insertion::Rejected(Rejection::OutsideRegion));
        assert!(tree.is_empty());

        tree.insert(body(1.0, 1.0, 1.0));
        assert_eq!(
            tree.insert(body(1.0, 0.0, -10.5)),
            Insertion::Rejected(Rejection::OutsideRegion)
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn split_into_different_quadrants() {
        let mut tree = SpatialTree::with_region(region(10.0));
        tree.insert(body(1.0, -5.0, 5.0));
        tree.insert(body(1.0, 5.0, -5.0));

        let root = tree.node(tree.root().unwrap());
        assert!(!root.is_leaf());
        let nw = tree.node(root.child(Quadrant::NorthWest).unwrap());
        let se = tree.node(root.child(Quadrant::SouthEast).unwrap());
        assert!(root.child(Quadrant::NorthEast).is_none());
        assert!(root.child(Quadrant::SouthWest).is_none());

        assert_eq!(nw.position(), Vector::new(-5.0, 5.0));
        assert_eq!(nw.region, region(10.0).subregion(Quadrant::NorthWest));
        assert_eq!(se.position(), Vector::new(5.0, -5.0));
        assert_eq!(nw.depth, 1);
    }

    #[test]
    fn same_quadrant_splits_one_level_deeper() {
        let mut tree = SpatialTree::with_region(region(10.0));
        // both in NE of the root; in the NE cell [0,10]^2 they split into SW and NE
        tree.insert(body(1.0, 2.0, 2.0));
        tree.insert(body(1.0, 8.0, 8.0));

        let root = tree.node(tree.root().unwrap());
        let ne_id = root.child(Quadrant::NorthEast).unwrap();
        assert_eq!(root.children().iter().flatten().count(), 1);

        let ne = tree.node(ne_id);
        assert!(!ne.is_leaf());
        assert_eq!(ne.depth, 1);
        let sw = tree.node(ne.child(Quadrant::SouthWest).unwrap());
        let ne_ne = tree.node(ne.child(Quadrant::NorthEast).unwrap());
        assert_eq!(sw.position(), Vector::new(2.0, 2.0));
        assert_eq!(ne_ne.position(), Vector::new(8.0, 8.0));
        assert_eq!(tree.depth(), Some(2));
    }

    #[test]
    fn insertion_into_occupied_slot_descends() {
        let mut tree = SpatialTree::with_region(region(10.0));
        tree.insert(body(1.0, -5.0, 5.0));
        tree.insert(body(1.0, 5.0, 5.0));
        // NW is occupied by a leaf; must split it, not replace it
        tree.insert(body(1.0, -2.0, 8.0));
        // empty SW slot gets a fresh leaf
        tree.insert(body(1.0, -5.0, -5.0));

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.leaves().count(), 4);
        let mut positions: Vec<_> = tree.leaves().map(|p| (p.position.x, p.position.y)).collect();
        positions.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(positions, vec![(-5.0, -5.0), (-5.0, 5.0), (-2.0, 8.0), (5.0, 5.0)]);
    }

    #[test]
    fn coincident_particles_merge() {
        let mut tree = SpatialTree::with_region(region(10.0));
        tree.insert(Particle::new(1.0, Vector::new(3.0, 3.0), Vector::new(2.0, 0.0)));
        let outcome = tree.insert(Particle::new(3.0, Vector::new(3.0, 3.0), Vector::new(-2.0, 0.0)));

        assert_eq!(outcome, Insertion::Merged);
        assert_eq!(tree.node_count(), 1);
        let merged = tree.leaves().next().unwrap();
        assert_relative_eq!(merged.mass, 4.0);
        assert_relative_eq!(merged.velocity.x, -1.0);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn depth_is_bounded_for_near_coincident_particles() {
        let params = TreeParams::default().with_max_depth(8);
        let mut tree = SpatialTree::new(region(10.0), params);
        tree.insert(body(1.0, 1.0, 1.0));
        let outcome = tree.insert(body(1.0, 1.0 + 1e-12, 1.0));

        assert_eq!(outcome, Insertion::Merged);
        assert_eq!(tree.depth(), Some(8));
        assert_eq!(tree.leaves().count(), 1);
        tree.aggregate();
        assert_relative_eq!(tree.total_mass(), 2.0);
    }

    #[test]
    fn aggregation_sums_masses_and_weights_centroid() {
        let mut tree = SpatialTree::with_region(region(10.0));
        let bodies = [body(1.0, -5.0, 5.0), body(3.0, 5.0, 5.0), body(4.0, 5.0, -5.0)];
        tree.insert_all(bodies);
        tree.aggregate();

        assert_relative_eq!(tree.total_mass(), 8.0);
        let com = tree.center_of_mass().unwrap();
        assert_relative_eq!(com.x, (-5.0 + 15.0 + 20.0) / 8.0);
        assert_relative_eq!(com.y, (5.0 + 15.0 - 20.0) / 8.0);
    }

    #[test]
    fn zero_mass_conglomerate_falls_back_to_center() {
        let mut tree = SpatialTree::with_region(region(10.0));
        tree.insert(body(0.0, -5.0, 5.0));
        tree.insert(body(0.0, 5.0, -5.0));
        tree.aggregate();

        assert_eq!(tree.total_mass(), 0.0);
        assert_eq!(tree.center_of_mass(), Some(Vector::zero()));
    }

    #[test]
    fn force_query_requires_aggregation() {
        let mut tree = SpatialTree::with_region(region(10.0));
        let probe = body(1.0, 0.0, 0.0);
        assert_eq!(tree.force_on(&probe), Ok(Vector::zero()));

        tree.insert(body(1.0, 5.0, 5.0));
        tree.insert(body(1.0, -5.0, 5.0));
        assert!(!tree.is_aggregated());
        assert_eq!(tree.force_on(&probe), Err(Error::NotAggregated));
        assert_eq!(tree.forces(&[probe]), Err(Error::NotAggregated));

        tree.aggregate();
        assert!(tree.is_aggregated());
        assert!(tree.force_on(&probe).is_ok());

        // inserting invalidates the aggregates again
        tree.insert(body(1.0, 5.0, -5.0));
        assert!(!tree.is_aggregated());
    }

    #[test]
    fn single_body_force_matches_point_mass() {
        let params = unit_g().with_theta(0.5);
        let source = body(4.0, 3.0, 4.0);
        let probe = body(2.0, 0.0, 0.0);
        let tree = SpatialTree::build(region(10.0), params, &[source]);

        let force = tree.force_on(&probe).unwrap();
        // |F| = 1 * 2 * 4 / 25, towards (3, 4)
        assert_relative_eq!(force.x, 8.0 / 25.0 * 0.6);
        assert_relative_eq!(force.y, 8.0 / 25.0 * 0.8);
        assert_eq!(force, pairwise_force(&probe, 4.0, source.position, 1.0, params.softening));
    }

    #[test]
    fn distant_conglomerate_is_used_as_point_mass() {
        let params = unit_g().with_theta(0.5);
        // cluster in the NE corner, probe far away in the SW corner
        let cluster = [body(1.0, 90.0, 90.0), body(1.0, 92.0, 92.0)];
        let mut tree = SpatialTree::new(region(100.0), params);
        tree.insert_all(cluster);
        tree.aggregate();

        let probe = body(1.0, -100.0, -100.0);
        let force = tree.force_on(&probe).unwrap();
        let com = tree.center_of_mass().unwrap();
        let root_size = tree.region().size();
        assert!(root_size > 0.5 * distance(probe.position, com));

        // the cell holding both bodies is small enough to be accepted
        let expected = pairwise_force(&probe, 2.0, Vector::new(91.0, 91.0), 1.0, params.softening);
        assert_relative_eq!(force.x, expected.x, max_relative = 1e-12);
        assert_relative_eq!(force.y, expected.y, max_relative = 1e-12);
    }

    #[test]
    fn self_interaction_is_softened_away() {
        let p = body(5.0, 1.0, 1.0);
        let tree = SpatialTree::build(region(10.0), unit_g(), &[p]);
        assert_eq!(tree.force_on(&p), Ok(Vector::zero()));
    }

    #[test]
    fn accepted_cell_acts_like_its_single_body() {
        let params = unit_g().with_theta(0.5);
        let source = body(3.0, 2.0, -1.0);
        let tree = SpatialTree::build(region(10.0), params, &[source]);
        assert_eq!(tree.params().theta, 0.5);

        // root size 20 against a distance of ~71 passes the opening test
        let probe = body(1.0, 60.0, 40.0);
        assert!(tree.region().size() <= params.theta * distance(probe.position, source.position));
        let leaf_force = tree.force_on(&probe).unwrap();
        assert_ne!(leaf_force, Vector::zero());

        let root = tree.root().unwrap();
        let mut tagged = tree.clone();
        tagged.nodes[root.index()].kind = NodeKind::Conglomerate {
            mass: source.mass,
            centroid: source.position,
            children: [None; 4],
        };
        assert!(!tagged.node(root).is_leaf());
        assert_eq!(tagged.force_on(&probe), Ok(leaf_force));
    }

    #[test]
    fn leaf_within_softening_exerts_no_force() {
        let params = unit_g().with_softening(1.0);
        let tree = SpatialTree::build(region(10.0), params, &[body(2.0, 0.0, 0.0)]);

        assert_eq!(tree.force_on(&body(1.0, 0.5, 0.0)), Ok(Vector::zero()));
        assert_eq!(tree.force_on(&body(1.0, 0.0, -0.99)), Ok(Vector::zero()));
        // just past the cut-off the plain inverse square applies
        let force = tree.force_on(&body(1.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(force.x, -0.5);
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn target_on_a_group_centroid_still_feels_its_members() {
        let particles = [
            body(1.0, 0.0, 0.0),
            body(1.0, 3.0, 1.0),
            body(1.0, -3.0, -1.0),
            body(2.0, 1.0, -2.0),
            body(1.0, -2.0, 4.0),
        ];
        for params in [unit_g(), unit_g().with_theta(0.5)] {
            let tree = SpatialTree::build(region(10.0), params, &particles);
            // the first body sits exactly on the root centroid
            assert_eq!(tree.center_of_mass(), Some(Vector::zero()));

            let walked = tree.forces_sequential(&particles).unwrap();
            let direct = direct_forces(&particles, &params);
            assert_ne!(walked[0], Vector::zero());
            for (w, d) in walked.iter().zip(&direct) {
                assert_relative_eq!(w.x, d.x, epsilon = 1e-12, max_relative = 1e-9);
                assert_relative_eq!(w.y, d.y, epsilon = 1e-12, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn exact_walk_matches_direct_sum() {
        let params = unit_g().with_softening(1e-9);
        let particles: Vec<_> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.7;
                body(1.0 + (i % 3) as f64, 8.0 * t.sin() * (i as f64 / 40.0), 7.0 * t.cos())
            })
            .collect();
        let tree = SpatialTree::build(region(10.0), params, &particles);
        let approx = tree.forces_sequential(&particles).unwrap();
        let exact = direct_forces(&particles, &params);

        for (a, e) in approx.iter().zip(&exact) {
            assert_relative_eq!(a.x, e.x, epsilon = 1e-9, max_relative = 1e-9);
            assert_relative_eq!(a.y, e.y, epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn parallel_and_sequential_forces_agree() {
        let particles: Vec<_> = (0..100)
            .map(|i| body(1.0, (i as f64 * 1.3) % 19.0 - 9.5, (i as f64 * 2.9) % 19.0 - 9.5))
            .collect();
        let tree = SpatialTree::build(region(10.0), unit_g().with_theta(0.7), &particles);
        assert_eq!(
            tree.forces(&particles).unwrap(),
            tree.forces_sequential(&particles).unwrap()
        );
    }

    #[test]
    fn clear_releases_everything() {
        let mut tree = SpatialTree::build(region(10.0), unit_g(), &[body(1.0, 1.0, 1.0), body(1.0, -1.0, 1.0)]);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.region(), region(10.0));
        assert_abs_diff_eq!(tree.total_mass(), 0.0);
    }

    #[test]
    fn dump_lists_cells() {
        let tree = SpatialTree::build(region(10.0), unit_g(), &[body(1.0, -5.0, 5.0), body(2.0, 5.0, 5.0)]);
        let dump = tree.to_string();
        assert!(dump.starts_with("root: min_corner: (-10, -10) max_corner: (10, 10) : conglomerate mass: 3"));
        assert!(dump.contains("  nw: leaf mass: 1 position: (-5, 5)"));
        assert!(dump.contains("  ne: leaf mass: 2 position: (5, 5)"));
        assert!(dump.contains("  se: -"));

        let empty = SpatialTree::with_region(region(1.0));
        assert_eq!(empty.to_string(), "root: min_corner: (-1, -1) max_corner: (1, 1) : -\n");
    }
}
