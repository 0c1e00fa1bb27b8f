//! Bed orientation of a five-axis printer.
//!
//! An orientation `(angle_x, angle_z)` in degrees describes the layer
//! normal `m = Rz(angle_z) · Rx(angle_x) · Z`. Layers printed in that
//! orientation are computed in the machine frame, where the bed has been
//! rotated so that `m` points straight up.

use serde::{Deserialize, Serialize};

use crate::{Point3, Transform, Vec3};

/// Tilt below which the azimuth is meaningless and reported as zero.
const VERTICAL_EPS: f64 = 1e-9;

/// Bed tilt about X followed by a turn about Z, both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Tilt about the X axis (degrees).
    pub angle_x: f64,
    /// Rotation about the Z axis (degrees).
    pub angle_z: f64,
}

impl Orientation {
    /// The untilted, axis-aligned orientation.
    pub const PLANAR: Self = Self {
        angle_x: 0.0,
        angle_z: 0.0,
    };

    /// Create an orientation from degrees.
    pub fn new(angle_x: f64, angle_z: f64) -> Self {
        Self { angle_x, angle_z }
    }

    /// Unit layer normal in world coordinates.
    pub fn normal(&self) -> Vec3 {
        let r = Transform::rotation_z(self.angle_z.to_radians())
            .then(&Transform::rotation_x(self.angle_x.to_radians()));
        r.apply_vec(&Vec3::z())
    }

    /// Orientation whose layer normal is `normal`. The tilt is always
    /// non-negative; a vertical normal yields [`Orientation::PLANAR`].
    pub fn from_normal(normal: &Vec3) -> Self {
        let n = normal.normalize();
        let angle_x = n.z.clamp(-1.0, 1.0).acos();
        if angle_x.sin().abs() < VERTICAL_EPS {
            return Self::new(angle_x.to_degrees(), 0.0);
        }
        let angle_z = n.x.atan2(-n.y);
        Self::new(angle_x.to_degrees(), angle_z.to_degrees())
    }

    /// True when no rotation is applied.
    pub fn is_planar(&self) -> bool {
        self.angle_x == 0.0 && self.angle_z == 0.0
    }

    /// Angle between this layer normal and the vertical, degrees.
    pub fn tilt(&self) -> f64 {
        self.normal().z.clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Round both angles to multiples of `step` degrees; a tilt that rounds
    /// to zero drops the azimuth too.
    pub fn quantized(&self, step: f64) -> Self {
        let round = |a: f64| (a / step).round() * step + 0.0;
        let angle_x = round(self.angle_x);
        if angle_x == 0.0 {
            return Self::PLANAR;
        }
        Self::new(angle_x, round(self.angle_z))
    }

    /// World → machine transform: rotates the model about `center` so that
    /// this orientation's layer normal becomes +Z.
    pub fn machine_transform(&self, center: &Point3) -> Transform {
        let inverse = Transform::rotation_x(-self.angle_x.to_radians())
            .then(&Transform::rotation_z(-self.angle_z.to_radians()));
        Transform::about_point(center, &inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_planar_normal_is_up() {
        let n = Orientation::PLANAR.normal();
        assert_abs_diff_eq!(n.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tilt_about_x() {
        let n = Orientation::new(30.0, 0.0).normal();
        assert_abs_diff_eq!(n.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(n.y, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(n.z, 3f64.sqrt() / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_normal_round_trip() {
        let o = Orientation::new(25.0, 130.0);
        let back = Orientation::from_normal(&o.normal());
        assert_abs_diff_eq!(back.angle_x, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back.angle_z, 130.0, epsilon = 1e-9);
    }

    #[test]
    fn test_machine_transform_points_normal_up() {
        let o = Orientation::new(40.0, -70.0);
        let t = o.machine_transform(&Point3::new(3.0, -2.0, 1.0));
        let up = t.apply_vec(&o.normal());
        assert_abs_diff_eq!(up.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quantized_snaps_small_tilt_to_planar() {
        let o = Orientation::new(0.3, 45.0).quantized(1.0);
        assert!(o.is_planar());
        let o = Orientation::new(12.6, 44.7).quantized(1.0);
        assert_eq!(o, Orientation::new(13.0, 45.0));
    }
}
