#![warn(missing_docs)]

//! Geometry primitives for the tiltslice slicer.
//!
//! Thin wrappers around nalgebra providing the types the slicing pipeline
//! works with: points, vectors, affine transforms, machine orientations,
//! printed lines and paths, planes and triangle–plane intersection.

pub mod orientation;
pub mod path;
pub mod plane;

pub use orientation::Orientation;
pub use path::{Line, Path};
pub use plane::{Plane, PlaneHit, Triangle};

use nalgebra::{Matrix4, Unit, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in a layer's 2D plane.
pub type Point2 = nalgebra::Point2<f64>;

/// Distance under which a vertex counts as lying on a cutting plane.
///
/// A triangle with all three vertices inside this band is coplanar with the
/// plane and contributes no segment to that layer's contour.
pub const COPLANAR_TOLERANCE: f64 = 1e-9;

/// Distance under which two segment endpoints are joined while stitching.
pub const STITCH_TOLERANCE: f64 = 1e-6;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `v`.
    pub fn translation(v: &Vec3) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = v.x;
        m[(1, 3)] = v.y;
        m[(2, 3)] = v.z;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Apply `inner` as if `center` were the origin.
    ///
    /// Used for bed rotations, which pivot around the machine's rotation
    /// center rather than the model origin.
    pub fn about_point(center: &Point3, inner: &Transform) -> Self {
        Transform::translation(&center.coords)
            .then(inner)
            .then(&Transform::translation(&-center.coords))
    }

    /// Compose: `self` then `other` (self * other), so `other` applies first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// True when this is the identity within `eps` per matrix entry.
    pub fn is_identity(&self, eps: f64) -> bool {
        (self.matrix - Matrix4::identity()).amax() <= eps
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Euclidean distance between two points.
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    nalgebra::distance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_translation() {
        let t = Transform::translation(&Vec3::new(10.0, 20.0, 30.0));
        let result = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert_abs_diff_eq!(result.x, 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.y, 22.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.z, 33.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(result.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_x_tilts_up_vector() {
        let t = Transform::rotation_x(PI / 2.0);
        let v = t.apply_vec(&Vec3::z());
        assert_abs_diff_eq!(v.y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_about_point_keeps_center_fixed() {
        let center = Point3::new(5.0, 5.0, 0.0);
        let t = Transform::about_point(&center, &Transform::rotation_z(PI / 3.0));
        let moved = t.apply_point(&center);
        assert_abs_diff_eq!(distance(&moved, &center), 0.0, epsilon = 1e-12);

        let p = t.apply_point(&Point3::new(6.0, 5.0, 0.0));
        assert_abs_diff_eq!(distance(&p, &center), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::rotation_x(0.3).then(&Transform::translation(&Vec3::new(1.0, 2.0, 3.0)));
        let inv = t.inverse().unwrap();
        assert!(t.then(&inv).is_identity(1e-12));
    }
}
