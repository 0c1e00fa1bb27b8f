//! Triangle-count reduction by quadric-error edge collapse.
//!
//! Each vertex carries the sum of the plane quadrics of its faces. Edges are
//! collapsed cheapest-first; the merged vertex is placed at the quadric
//! optimum when that lies inside the input bounding box, otherwise at the
//! cheaper endpoint or the midpoint. Collapses that would break the
//! manifold (link condition), flip a neighbouring face or undershoot the
//! target are skipped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use nalgebra::{Matrix4, Vector4};
use tracing::{debug, info};

use crate::error::SimplifyError;
use crate::{Aabb, IndexedMesh, Mesh};
use tiltslice_math::{Point3, Vec3};

/// Smallest closed triangle mesh.
const MIN_TRIANGLES: usize = 4;

/// Grid size used to merge coincident STL vertices before collapsing.
const WELD_TOLERANCE: f64 = 1e-9;

/// Slack allowed when testing the quadric optimum against the input box.
const BOUNDS_TOLERANCE: f64 = 1e-9;

/// Reduce `mesh` to exactly `target` triangles.
///
/// Returns the input unchanged when `target` equals its size. On a closed
/// 2-manifold every collapse removes two faces, so targets of the wrong
/// parity end in [`SimplifyError::Unreachable`].
pub fn simplify(mesh: &Mesh, target: usize) -> Result<Mesh, SimplifyError> {
    let actual = mesh.len();
    if actual < MIN_TRIANGLES {
        return Err(SimplifyError::MeshTooSmall(actual));
    }
    if target > actual {
        return Err(SimplifyError::TargetExceedsInput { target, actual });
    }
    if target < MIN_TRIANGLES {
        return Err(SimplifyError::TargetTooSmall(target));
    }
    if target == actual {
        return Ok(mesh.clone());
    }
    let Some(bounds) = mesh.bounds() else {
        return Err(SimplifyError::MeshTooSmall(0));
    };

    info!(original = actual, target, "Starting mesh simplification");

    let mut collapser = Collapser::new(&mesh.weld(WELD_TOLERANCE), bounds);
    let mut round = 0;
    while collapser.face_count > target {
        let before = collapser.face_count;
        collapser.run(target);
        round += 1;
        debug!(round, faces = collapser.face_count, "Collapse round finished");
        if collapser.face_count == before {
            break;
        }
    }

    let achieved = collapser.face_count;
    if achieved != target {
        return Err(SimplifyError::Unreachable { target, achieved });
    }

    info!(
        triangles = achieved,
        collapses = collapser.collapses,
        "Mesh simplification complete"
    );
    Ok(collapser.into_mesh())
}

/// A queued collapse; ordered so the heap pops the cheapest first.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    a: u32,
    b: u32,
    stamp_a: u32,
    stamp_b: u32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.a, other.b).cmp(&(self.a, self.b)))
    }
}

struct Collapser {
    positions: Vec<Point3>,
    quadrics: Vec<Matrix4<f64>>,
    /// Bumped whenever a vertex moves or dies, invalidating queued candidates.
    stamps: Vec<u32>,
    alive: Vec<bool>,
    faces: Vec<Option<[u32; 3]>>,
    /// Face ids per vertex; may hold stale ids, filtered on use.
    vertex_faces: Vec<Vec<usize>>,
    face_count: usize,
    collapses: usize,
    bounds: Aabb,
    heap: BinaryHeap<Candidate>,
}

impl Collapser {
    fn new(mesh: &IndexedMesh, bounds: Aabb) -> Self {
        let n = mesh.vertices.len();
        let mut quadrics = vec![Matrix4::zeros(); n];
        let mut vertex_faces = vec![Vec::new(); n];

        for (fi, face) in mesh.faces.iter().enumerate() {
            let [a, b, c] = face.map(|i| mesh.vertices[i as usize]);
            let cross = (b - a).cross(&(c - a));
            if let Some(normal) = cross.try_normalize(1e-15) {
                let plane = Vector4::new(normal.x, normal.y, normal.z, -normal.dot(&a.coords));
                let k = plane * plane.transpose();
                for &v in face {
                    quadrics[v as usize] += k;
                }
            }
            for &v in face {
                vertex_faces[v as usize].push(fi);
            }
        }

        Self {
            positions: mesh.vertices.clone(),
            quadrics,
            stamps: vec![0; n],
            alive: vec![true; n],
            faces: mesh.faces.iter().copied().map(Some).collect(),
            vertex_faces,
            face_count: mesh.faces.len(),
            collapses: 0,
            bounds,
            heap: BinaryHeap::new(),
        }
    }

    /// One pass over a freshly built queue of every current edge.
    fn run(&mut self, target: usize) {
        let mut edges = HashSet::new();
        for face in self.faces.iter().flatten() {
            for i in 0..3 {
                let (a, b) = (face[i], face[(i + 1) % 3]);
                edges.insert((a.min(b), a.max(b)));
            }
        }
        let mut edges: Vec<_> = edges.into_iter().collect();
        edges.sort_unstable();
        self.heap = edges.into_iter().map(|(a, b)| self.candidate(a, b)).collect();

        while self.face_count > target {
            let Some(c) = self.heap.pop() else {
                break;
            };
            let (a, b) = (c.a as usize, c.b as usize);
            if !self.alive[a]
                || !self.alive[b]
                || self.stamps[a] != c.stamp_a
                || self.stamps[b] != c.stamp_b
            {
                continue;
            }
            self.try_collapse(c.a, c.b, target);
        }
    }

    fn candidate(&self, a: u32, b: u32) -> Candidate {
        let cost = self
            .placements(a, b)
            .first()
            .map_or(f64::INFINITY, |(cost, _)| *cost);
        Candidate {
            cost,
            a,
            b,
            stamp_a: self.stamps[a as usize],
            stamp_b: self.stamps[b as usize],
        }
    }

    /// Candidate positions for the merged vertex, cheapest first.
    fn placements(&self, a: u32, b: u32) -> Vec<(f64, Point3)> {
        let q = self.quadrics[a as usize] + self.quadrics[b as usize];
        let pa = self.positions[a as usize];
        let pb = self.positions[b as usize];

        let mut points = vec![pa, pb, nalgebra::center(&pa, &pb)];
        if let Some(p) = optimum(&q) {
            if self.bounds.contains(&p, BOUNDS_TOLERANCE) {
                points.push(p);
            }
        }

        let mut scored: Vec<(f64, Point3)> =
            points.into_iter().map(|p| (quadric_cost(&q, &p), p)).collect();
        scored.sort_by(|x, y| x.0.total_cmp(&y.0));
        scored
    }

    fn faces_of(&self, v: u32) -> Vec<usize> {
        let mut out: Vec<usize> = self.vertex_faces[v as usize]
            .iter()
            .copied()
            .filter(|&f| self.faces[f].is_some_and(|t| t.contains(&v)))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn neighbours(&self, v: u32) -> HashSet<u32> {
        self.faces_of(v)
            .into_iter()
            .filter_map(|f| self.faces[f])
            .flatten()
            .filter(|&u| u != v)
            .collect()
    }

    fn try_collapse(&mut self, a: u32, b: u32, target: usize) -> bool {
        let shared: Vec<usize> = self
            .faces_of(a)
            .into_iter()
            .filter(|&f| self.faces[f].is_some_and(|t| t.contains(&b)))
            .collect();
        if shared.is_empty() || self.face_count - shared.len() < target {
            return false;
        }
        if !self.link_condition(a, b, &shared) {
            return false;
        }

        let affected: Vec<usize> = self
            .faces_of(a)
            .into_iter()
            .chain(self.faces_of(b))
            .filter(|f| !shared.contains(f))
            .collect();

        let placement = self
            .placements(a, b)
            .into_iter()
            .map(|(_, p)| p)
            .find(|p| !self.flips_any(&affected, a, b, p));
        let Some(p) = placement else {
            return false;
        };

        self.apply(a, b, p, &shared);
        true
    }

    /// The common neighbours of `a` and `b` must be exactly the apexes of
    /// the faces on edge `a`–`b`.
    fn link_condition(&self, a: u32, b: u32, shared: &[usize]) -> bool {
        let apexes: HashSet<u32> = shared
            .iter()
            .filter_map(|&f| self.faces[f])
            .flatten()
            .filter(|&u| u != a && u != b)
            .collect();
        let na = self.neighbours(a);
        let nb = self.neighbours(b);
        na.intersection(&nb).copied().collect::<HashSet<_>>() == apexes
    }

    fn flips_any(&self, affected: &[usize], a: u32, b: u32, p: &Point3) -> bool {
        affected.iter().filter_map(|&f| self.faces[f]).any(|face| {
            let before = face.map(|i| self.positions[i as usize]);
            let after = face.map(|i| if i == a || i == b { *p } else { self.positions[i as usize] });
            let n0 = face_cross(&before);
            let n1 = face_cross(&after);
            n1.norm() < 1e-12 || n0.dot(&n1) <= 0.0
        })
    }

    fn apply(&mut self, a: u32, b: u32, p: Point3, shared: &[usize]) {
        for &f in shared {
            self.faces[f] = None;
            self.face_count -= 1;
        }
        for f in self.faces_of(b) {
            if let Some(face) = self.faces[f].as_mut() {
                for v in face.iter_mut() {
                    if *v == b {
                        *v = a;
                    }
                }
            }
            self.vertex_faces[a as usize].push(f);
        }
        self.vertex_faces[b as usize].clear();

        let (ai, bi) = (a as usize, b as usize);
        self.alive[bi] = false;
        self.positions[ai] = p;
        let qb = self.quadrics[bi];
        self.quadrics[ai] += qb;
        self.stamps[ai] += 1;
        self.stamps[bi] += 1;
        self.collapses += 1;

        let mut around: Vec<u32> = self.neighbours(a).into_iter().collect();
        around.sort_unstable();
        for n in around {
            let c = self.candidate(a.min(n), a.max(n));
            self.heap.push(c);
        }
    }

    fn into_mesh(self) -> Mesh {
        IndexedMesh {
            vertices: self.positions,
            faces: self.faces.into_iter().flatten().collect(),
        }
        .to_mesh()
    }
}

fn face_cross(v: &[Point3; 3]) -> Vec3 {
    (v[1] - v[0]).cross(&(v[2] - v[0]))
}

fn quadric_cost(q: &Matrix4<f64>, p: &Point3) -> f64 {
    let v = Vector4::new(p.x, p.y, p.z, 1.0);
    v.dot(&(q * v)).max(0.0)
}

/// Point minimizing the quadric, `None` when the system is near singular.
fn optimum(q: &Matrix4<f64>) -> Option<Point3> {
    let a = q.fixed_view::<3, 3>(0, 0).into_owned();
    if a.determinant().abs() < 1e-12 {
        return None;
    }
    let rhs = -q.fixed_view::<3, 1>(0, 3).into_owned();
    let x = a.try_inverse()? * rhs;
    Some(Point3::from(x))
}
