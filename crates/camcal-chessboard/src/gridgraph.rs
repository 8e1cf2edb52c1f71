//! Neighbor graph over corner candidates and integer labelling of its
//! components.

use crate::geom::{angle_diff_abs, axis_vec_diff, is_orthogonal};
use crate::params::GridGraphParams;
use camcal_core::Corner;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// Step from a node to one of its four lattice neighbors, relative to the
/// estimated grid axes `u` (east) and `v` (south).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    East,
    West,
    North,
    South,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::East, Step::West, Step::North, Step::South];

    pub fn reverse(self) -> Self {
        match self {
            Step::East => Step::West,
            Step::West => Step::East,
            Step::North => Step::South,
            Step::South => Step::North,
        }
    }

    /// Label offset `(di, dj)`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Step::East => (1, 0),
            Step::West => (-1, 0),
            Step::North => (0, -1),
            Step::South => (0, 1),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Accepted link to another candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub target: usize,
    pub length: f32,
    /// Summed angular mismatch in radians; lower is better.
    pub cost: f32,
}

impl Edge {
    fn beats(&self, other: &Edge) -> bool {
        self.cost < other.cost || (self.cost == other.cost && self.length < other.length)
    }
}

/// Image-space unit vectors of the two board axes.
#[derive(Clone, Copy, Debug)]
pub struct GridAxes {
    pub u: Vector2<f32>,
    pub v: Vector2<f32>,
}

impl GridAxes {
    pub fn from_angle(theta_u: f32) -> Self {
        let (s, c) = theta_u.sin_cos();
        Self {
            u: Vector2::new(c, s),
            v: Vector2::new(-s, c),
        }
    }

    fn step_of(&self, dir: &Vector2<f32>) -> Step {
        let (du, dv) = (dir.dot(&self.u), dir.dot(&self.v));
        match (du.abs() >= dv.abs(), du >= 0.0, dv >= 0.0) {
            (true, true, _) => Step::East,
            (true, false, _) => Step::West,
            (false, _, true) => Step::South,
            (false, _, false) => Step::North,
        }
    }
}

/// Angle of the board axis nearest image `+x`, in `[-π/4, π/4)`.
///
/// Neighboring corners have diagonals a quarter turn apart, so orientations
/// are averaged as `4θ` unit vectors weighted by strength. `None` when no
/// direction dominates.
pub fn grid_axis_angle(corners: &[Corner]) -> Option<f32> {
    let (acc, total) = corners
        .iter()
        .filter(|c| c.strength > 0.0)
        .fold((Vector2::<f32>::zeros(), 0.0f32), |(acc, total), c| {
            let (s, co) = (4.0 * c.orientation).sin_cos();
            (acc + c.strength * Vector2::new(co, s), total + c.strength)
        });
    if total <= 0.0 {
        return None;
    }
    let mean = acc / total;
    if mean.norm_squared() < 1e-6 {
        return None;
    }
    let diagonal = 0.25 * mean.y.atan2(mean.x);
    Some((diagonal + FRAC_PI_2).rem_euclid(FRAC_PI_2) - FRAC_PI_4)
}

fn kd_tree(corners: &[Corner]) -> KdTree<f32, 2> {
    let points: Vec<[f32; 2]> = corners
        .iter()
        .map(|c| [c.position.x, c.position.y])
        .collect();
    (&points).into()
}

/// Median nearest-neighbor distance, the expected lattice pitch in pixels.
pub fn nearest_spacing(corners: &[Corner]) -> Option<f32> {
    if corners.len() < 2 {
        return None;
    }
    let tree = kd_tree(corners);
    let mut dists: Vec<f32> = corners
        .iter()
        .enumerate()
        .filter_map(|(n, c)| {
            tree.nearest_n::<SquaredEuclidean>(&[c.position.x, c.position.y], 2)
                .into_iter()
                .find(|hit| hit.item as usize != n)
                .map(|hit| hit.distance.sqrt())
        })
        .filter(|d| *d > 0.0)
        .collect();
    if dists.is_empty() {
        return None;
    }
    let mid = dists.len() / 2;
    Some(*dists.select_nth_unstable_by(mid, f32::total_cmp).1)
}

/// Candidate edge `from -> to`, or `None` if the pair cannot be lattice
/// neighbors.
fn link(
    from: &Corner,
    to: &Corner,
    target: usize,
    params: &GridGraphParams,
    axes: &GridAxes,
    spacing: f32,
) -> Option<(Step, Edge)> {
    let tol = params.orientation_tolerance_deg.to_radians();
    // adjacent saddles have swapped diagonals
    if !is_orthogonal(from.orientation, to.orientation, tol) {
        return None;
    }

    let delta = to.position - from.position;
    let length = delta.norm();
    let window = params.min_spacing_ratio * spacing..=params.max_spacing_ratio * spacing;
    if !window.contains(&length) {
        return None;
    }

    // a lattice edge bisects both diagonals
    let heading = delta.y.atan2(delta.x);
    let skew_from = (axis_vec_diff(from.orientation, heading) - FRAC_PI_4).abs();
    let skew_to = (axis_vec_diff(to.orientation, heading) - FRAC_PI_4).abs();
    if skew_from > tol || skew_to > tol {
        return None;
    }
    let skew_pair = (FRAC_PI_2 - angle_diff_abs(from.orientation, to.orientation)).abs();

    Some((
        axes.step_of(&(delta / length)),
        Edge {
            target,
            length,
            cost: skew_from + skew_to + skew_pair,
        },
    ))
}

/// 4-connected lattice graph. Each node keeps at most one edge per [`Step`],
/// and every stored edge has a matching reverse edge.
#[derive(Clone, Debug)]
pub struct GridGraph {
    nodes: Vec<[Option<Edge>; 4]>,
}

impl GridGraph {
    pub fn build(
        corners: &[Corner],
        params: &GridGraphParams,
        axes: GridAxes,
        spacing: f32,
    ) -> Self {
        let tree = kd_tree(corners);
        let nodes: Vec<[Option<Edge>; 4]> = corners
            .iter()
            .enumerate()
            .map(|(n, corner)| {
                let mut slots = [None; 4];
                let query = [corner.position.x, corner.position.y];
                for hit in tree.nearest_n::<SquaredEuclidean>(&query, params.k_neighbors + 1) {
                    let m = hit.item as usize;
                    if m == n {
                        continue;
                    }
                    if let Some((step, edge)) = link(corner, &corners[m], m, params, &axes, spacing)
                    {
                        let slot: &mut Option<Edge> = &mut slots[step.index()];
                        if slot.map_or(true, |cur| edge.beats(&cur)) {
                            *slot = Some(edge);
                        }
                    }
                }
                slots
            })
            .collect();

        let mutual = nodes
            .iter()
            .enumerate()
            .map(|(n, slots)| {
                let mut kept = [None; 4];
                for step in Step::ALL {
                    kept[step.index()] = slots[step.index()].filter(|e| {
                        nodes[e.target][step.reverse().index()].is_some_and(|back| back.target == n)
                    });
                }
                kept
            })
            .collect();
        Self { nodes: mutual }
    }

    /// Edge leaving `node` in direction `step`.
    pub fn edge(&self, node: usize, step: Step) -> Option<&Edge> {
        self.nodes.get(node)?[step.index()].as_ref()
    }

    pub fn edges(&self, node: usize) -> impl Iterator<Item = (Step, &Edge)> + '_ {
        Step::ALL
            .into_iter()
            .filter_map(move |step| self.edge(node, step).map(|e| (step, e)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().flatten().flatten().count() / 2
    }

    /// Node sets of the connected components, singletons included.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        for root in 0..self.nodes.len() {
            if seen[root] {
                continue;
            }
            seen[root] = true;
            let mut members = Vec::new();
            let mut stack = vec![root];
            while let Some(n) = stack.pop() {
                members.push(n);
                for (_, e) in self.edges(n) {
                    if !seen[e.target] {
                        seen[e.target] = true;
                        stack.push(e.target);
                    }
                }
            }
            out.push(members);
        }
        out
    }

    /// Breadth-first integer labels `(node, i, j)` for a component, rooted at
    /// its first node.
    ///
    /// `None` when two paths reach a node with different labels or two nodes
    /// share a label.
    pub fn label_component(&self, component: &[usize]) -> Option<Vec<(usize, i32, i32)>> {
        let root = *component.first()?;
        let mut label: Vec<Option<(i32, i32)>> = vec![None; self.nodes.len()];
        let mut out = Vec::with_capacity(component.len());
        let mut queue = VecDeque::from([root]);
        label[root] = Some((0, 0));

        while let Some(n) = queue.pop_front() {
            let (i, j) = label[n]?;
            out.push((n, i, j));
            for (step, e) in self.edges(n) {
                let (di, dj) = step.offset();
                let want = (i + di, j + dj);
                match label[e.target] {
                    None => {
                        label[e.target] = Some(want);
                        queue.push_back(e.target);
                    }
                    Some(have) if have != want => return None,
                    Some(_) => {}
                }
            }
        }

        let mut cells: Vec<(i32, i32)> = out.iter().map(|&(_, i, j)| (i, j)).collect();
        cells.sort_unstable();
        let unique = cells.windows(2).all(|w| w[0] != w[1]);
        unique.then_some(out)
    }
}
