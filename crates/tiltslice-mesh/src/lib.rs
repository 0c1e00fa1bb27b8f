#![warn(missing_docs)]

//! Triangle meshes for the tiltslice slicer.
//!
//! A [`Mesh`] is an immutable value: whole-mesh operations such as
//! [`Mesh::translated`], [`Mesh::transformed`] and [`simplify`] return a new
//! mesh rather than editing in place.
//!
//! # Example
//!
//! ```ignore
//! use tiltslice_mesh::{load_stl, simplify};
//!
//! let mesh = load_stl("part.stl")?;
//! let coarse = simplify(&mesh, 800)?;
//! println!("{} -> {} triangles", mesh.len(), coarse.len());
//! ```

pub mod error;
pub mod simplify;
pub mod stl;

pub use error::{MeshError, Result, SimplifyError};
pub use simplify::simplify;
pub use stl::{load_stl, parse_stl, save_stl, write_stl};

use std::collections::HashMap;

use tiltslice_math::{Point3, Transform, Triangle, Vec3};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb {
    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// True when `p` lies inside the box grown by `tolerance` on every side.
    pub fn contains(&self, p: &Point3, tolerance: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tolerance && p[i] <= self.max[i] + tolerance)
    }

    /// True when `self` lies inside `other` grown by `tolerance` on every side.
    pub fn within(&self, other: &Aabb, tolerance: f64) -> bool {
        (0..3).all(|i| {
            self.min[i] >= other.min[i] - tolerance && self.max[i] <= other.max[i] + tolerance
        })
    }

    fn grow(&mut self, p: &Point3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }
}

/// A triangulated surface, nominally closed and 2-manifold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Facets with outward counter-clockwise winding.
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    /// Create a mesh from facets.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Build a mesh from shared vertices and index triples.
    ///
    /// Returns `None` when an index is out of range.
    pub fn from_indexed(vertices: &[Point3], faces: &[[u32; 3]]) -> Option<Self> {
        let triangles = faces
            .iter()
            .map(|f| {
                Some(Triangle::new(
                    *vertices.get(f[0] as usize)?,
                    *vertices.get(f[1] as usize)?,
                    *vertices.get(f[2] as usize)?,
                ))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { triangles })
    }

    /// Closed box between two corners, twelve outward-facing triangles.
    pub fn cuboid(min: Point3, max: Point3) -> Self {
        let v = [
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, max.y, max.z),
        ];
        let faces: [[u32; 3]; 12] = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        let triangles = faces
            .iter()
            .map(|f| Triangle::new(v[f[0] as usize], v[f[1] as usize], v[f[2] as usize]))
            .collect();
        Self { triangles }
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = self.triangles.first()?.vertices[0];
        let mut bb = Aabb {
            min: first,
            max: first,
        };
        for tri in &self.triangles {
            for v in &tri.vertices {
                bb.grow(v);
            }
        }
        Some(bb)
    }

    /// Smallest and largest vertex projection onto `dir`.
    pub fn extent_along(&self, dir: &Vec3) -> Option<(f64, f64)> {
        if self.triangles.is_empty() {
            return None;
        }
        Some(
            self.triangles
                .iter()
                .map(|t| t.extent_along(dir))
                .fold((f64::MAX, f64::MIN), |(lo, hi), (a, b)| (lo.min(a), hi.max(b))),
        )
    }

    /// The mesh moved by `offset`.
    pub fn translated(&self, offset: &Vec3) -> Self {
        self.transformed(&Transform::translation(offset))
    }

    /// The mesh moved so that its bounding-box center sits at
    /// `origin.x, origin.y` and its lowest point at `origin.z`.
    pub fn shifted_to(&self, origin: &Point3) -> Self {
        let Some(bb) = self.bounds() else {
            return self.clone();
        };
        let center = bb.center();
        let offset = Vec3::new(origin.x - center.x, origin.y - center.y, origin.z - bb.min.z);
        self.translated(&offset)
    }

    /// The mesh with every vertex moved by `t`.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            triangles: self.triangles.iter().map(|tri| tri.transformed(t)).collect(),
        }
    }

    /// Total surface area.
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }

    /// Merge coincident vertices into a shared-vertex representation.
    ///
    /// Vertices closer than `tolerance` on every axis (by grid cell) are
    /// merged; faces that collapse to fewer than three distinct vertices
    /// are dropped.
    pub fn weld(&self, tolerance: f64) -> IndexedMesh {
        let mut lookup: HashMap<[i64; 3], u32> = HashMap::new();
        let mut vertices: Vec<Point3> = Vec::new();
        let mut faces = Vec::with_capacity(self.triangles.len());

        let scale = 1.0 / tolerance.max(f64::MIN_POSITIVE);
        for tri in &self.triangles {
            let mut face = [0u32; 3];
            for (slot, v) in face.iter_mut().zip(tri.vertices.iter()) {
                let key = [
                    (v.x * scale).round() as i64,
                    (v.y * scale).round() as i64,
                    (v.z * scale).round() as i64,
                ];
                *slot = *lookup.entry(key).or_insert_with(|| {
                    vertices.push(*v);
                    (vertices.len() - 1) as u32
                });
            }
            if face[0] != face[1] && face[1] != face[2] && face[0] != face[2] {
                faces.push(face);
            }
        }

        IndexedMesh { vertices, faces }
    }
}

/// Shared-vertex form of a [`Mesh`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Index triples into `vertices`.
    pub faces: Vec<[u32; 3]>,
}

impl IndexedMesh {
    /// Expand back into a triangle soup.
    pub fn to_mesh(&self) -> Mesh {
        Mesh::from_indexed(&self.vertices, &self.faces).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cuboid_bounds_and_area() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 10.0));
        assert_eq!(mesh.len(), 12);
        let bb = mesh.bounds().unwrap();
        assert_eq!(bb.min, Point3::origin());
        assert_eq!(bb.max, Point3::new(10.0, 10.0, 10.0));
        assert_abs_diff_eq!(mesh.area(), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cuboid_normals_point_outward() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(2.0, 2.0, 2.0));
        let center = Point3::new(1.0, 1.0, 1.0);
        for tri in &mesh.triangles {
            let n = tri.normal().unwrap();
            assert!(n.dot(&(tri.centroid() - center)) > 0.0);
        }
    }

    #[test]
    fn test_shifted_to_origin() {
        let mesh = Mesh::cuboid(Point3::new(5.0, 5.0, 3.0), Point3::new(15.0, 25.0, 13.0));
        let bb = mesh.shifted_to(&Point3::origin()).bounds().unwrap();
        assert_abs_diff_eq!(bb.center().x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bb.center().y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bb.min.z, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bb.extent().y, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_translated_leaves_original_untouched() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let moved = mesh.translated(&Vec3::new(0.0, 0.0, 5.0));
        assert_abs_diff_eq!(moved.bounds().unwrap().min.z, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mesh.bounds().unwrap().min.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weld_cuboid() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let indexed = mesh.weld(1e-6);
        assert_eq!(indexed.vertices.len(), 8);
        assert_eq!(indexed.faces.len(), 12);
        assert_eq!(indexed.to_mesh(), mesh);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::default().bounds().is_none());
        assert!(Mesh::default().extent_along(&Vec3::z()).is_none());
    }
}
