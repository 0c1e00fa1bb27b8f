//! Cutting planes, triangles and their intersection.

use std::cmp::Ordering;

use crate::{Dir3, Line, Point3, Transform, Vec3, COPLANAR_TOLERANCE};

/// Twice the area under which a triangle is treated as degenerate.
const DEGENERATE_AREA2: f64 = 1e-14;

/// An oriented plane given by a point on it and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3,
    /// Unit normal; the positive side is "above".
    pub normal: Dir3,
}

impl Plane {
    /// Create a plane, or `None` when `normal` has no direction.
    pub fn new(origin: Point3, normal: Vec3) -> Option<Self> {
        Dir3::try_new(normal, 1e-12).map(|normal| Self { origin, normal })
    }

    /// The horizontal plane `z = height` facing up.
    pub fn horizontal(height: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, height),
            normal: Vec3::z_axis(),
        }
    }

    /// Signed distance of `p` from the plane, positive above.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&(p - self.origin))
    }

    /// The same plane facing the other way.
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            normal: -self.normal,
        }
    }

    /// Move the plane with a rigid transform.
    pub fn transformed(&self, t: &Transform) -> Self {
        let normal = t.apply_vec(self.normal.as_ref());
        Self {
            origin: t.apply_point(&self.origin),
            normal: Dir3::new_normalize(normal),
        }
    }
}

/// Result of intersecting a triangle with a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneHit {
    /// The triangle lies strictly on one side.
    Miss,
    /// Only a single vertex touches the plane.
    Touch(Point3),
    /// The plane cuts the triangle along this segment. The segment is
    /// oriented so that, looking down the plane normal, the solid lies on
    /// its left.
    Segment(Line),
    /// All three vertices lie on the plane.
    Coplanar,
}

/// A mesh facet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices in counter-clockwise order seen from outside.
    pub vertices: [Point3; 3],
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unnormalized normal, length equal to twice the area.
    pub fn cross(&self) -> Vec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Unit outward normal, `None` for degenerate triangles.
    pub fn normal(&self) -> Option<Vec3> {
        let n = self.cross();
        if n.norm_squared() < DEGENERATE_AREA2 * DEGENERATE_AREA2 {
            None
        } else {
            Some(n.normalize())
        }
    }

    /// Surface area.
    pub fn area(&self) -> f64 {
        self.cross().norm() / 2.0
    }

    /// True when the triangle has (almost) no area.
    pub fn is_degenerate(&self) -> bool {
        self.normal().is_none()
    }

    /// Centroid of the three vertices.
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = self.vertices;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Smallest and largest projection of the vertices onto `dir`.
    pub fn extent_along(&self, dir: &Vec3) -> (f64, f64) {
        self.vertices
            .iter()
            .map(|v| v.coords.dot(dir))
            .fold((f64::MAX, f64::MIN), |(lo, hi), d| (lo.min(d), hi.max(d)))
    }

    /// The triangle moved by `t`.
    pub fn transformed(&self, t: &Transform) -> Self {
        Self {
            vertices: self.vertices.map(|v| t.apply_point(&v)),
        }
    }

    /// Intersect with a plane.
    ///
    /// Vertices within [`COPLANAR_TOLERANCE`] of the plane are treated as
    /// lying on it. An edge lying in the plane is reported only by the
    /// triangle whose third vertex is above, so a closed mesh yields each
    /// in-plane edge once.
    pub fn intersect_plane(&self, plane: &Plane) -> PlaneHit {
        let d = self.vertices.map(|v| {
            let dist = plane.signed_distance(&v);
            if dist.abs() <= COPLANAR_TOLERANCE {
                0.0
            } else {
                dist
            }
        });

        let above = d.iter().filter(|&&x| x > 0.0).count();
        let below = d.iter().filter(|&&x| x < 0.0).count();
        let on = 3 - above - below;

        let mut points: Vec<Point3> = Vec::with_capacity(2);
        match (above, below, on) {
            (_, _, 3) => return PlaneHit::Coplanar,
            (3, 0, 0) | (0, 3, 0) => return PlaneHit::Miss,
            (2, 0, 1) | (0, 2, 1) => {
                let idx = d.iter().position(|&x| x == 0.0).unwrap_or(0);
                return PlaneHit::Touch(self.vertices[idx]);
            }
            (0, 1, 2) => return PlaneHit::Miss,
            (1, 0, 2) => {
                for i in 0..3 {
                    if d[i] == 0.0 {
                        points.push(self.vertices[i]);
                    }
                }
            }
            _ => {
                for i in 0..3 {
                    let j = (i + 1) % 3;
                    if d[i] == 0.0 {
                        points.push(self.vertices[i]);
                    } else if d[j] != 0.0 && (d[i] > 0.0) != (d[j] > 0.0) {
                        points.push(edge_crossing(
                            &self.vertices[i],
                            &self.vertices[j],
                            d[i],
                            d[j],
                        ));
                    }
                }
            }
        }

        if points.len() != 2 || points[0] == points[1] {
            return match points.first() {
                Some(p) => PlaneHit::Touch(*p),
                None => PlaneHit::Miss,
            };
        }

        let Some(n) = self.normal() else {
            return PlaneHit::Miss;
        };
        let dir = plane.normal.cross(&n);
        let mut line = Line::new(points[0], points[1]);
        if (line.p2 - line.p1).dot(&dir) < 0.0 {
            line = line.reversed();
        }
        PlaneHit::Segment(line)
    }
}

/// Crossing point of edge `a`–`b` with the plane, evaluated in a fixed
/// vertex order so that both triangles sharing the edge get the same bits.
fn edge_crossing(a: &Point3, b: &Point3, da: f64, db: f64) -> Point3 {
    let (a, b, da, db) = match lexical_cmp(a, b) {
        Ordering::Greater => (b, a, db, da),
        _ => (a, b, da, db),
    };
    let t = da / (da - db);
    a + (b - a) * t
}

fn lexical_cmp(a: &Point3, b: &Point3) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn vertical_triangle() -> Triangle {
        // Lies in the plane y = 0, outward normal -Y.
        Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 10.0),
        )
    }

    #[test]
    fn test_segment_through_triangle() {
        let hit = vertical_triangle().intersect_plane(&Plane::horizontal(5.0));
        let PlaneHit::Segment(line) = hit else {
            panic!("expected segment, got {hit:?}");
        };
        assert_abs_diff_eq!(line.p1.z, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(line.length(), 5.0, epsilon = 1e-12);
        // Normal -Y, plane normal +Z: solid on the left means travel +X.
        assert!(line.p2.x > line.p1.x);
    }

    #[test]
    fn test_miss_above_and_below() {
        let tri = vertical_triangle();
        assert_eq!(tri.intersect_plane(&Plane::horizontal(11.0)), PlaneHit::Miss);
        assert_eq!(tri.intersect_plane(&Plane::horizontal(-1.0)), PlaneHit::Miss);
    }

    #[test]
    fn test_touch_at_apex() {
        let hit = vertical_triangle().intersect_plane(&Plane::horizontal(10.0));
        assert_eq!(hit, PlaneHit::Touch(Point3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_coplanar_is_reported() {
        let flat = Triangle::new(
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 2.0),
            Point3::new(0.0, 1.0, 2.0 + COPLANAR_TOLERANCE / 2.0),
        );
        assert_eq!(flat.intersect_plane(&Plane::horizontal(2.0)), PlaneHit::Coplanar);
    }

    #[test]
    fn test_edge_in_plane_reported_from_above_only() {
        let tri = vertical_triangle();
        let hit = tri.intersect_plane(&Plane::horizontal(0.0));
        assert!(matches!(hit, PlaneHit::Segment(_)));

        let flipped = tri.transformed(&Transform::rotation_x(std::f64::consts::PI));
        let hit = flipped.intersect_plane(&Plane::horizontal(0.0));
        assert_eq!(hit, PlaneHit::Miss);
    }

    #[test]
    fn test_shared_edge_crossing_is_bit_identical() {
        let a = Point3::new(0.1, 0.7, -1.3);
        let b = Point3::new(3.3, -2.9, 4.1);
        let plane = Plane::new(Point3::new(0.0, 0.0, 0.37), Vec3::new(0.1, 0.2, 1.0)).unwrap();
        let p = edge_crossing(&a, &b, plane.signed_distance(&a), plane.signed_distance(&b));
        let q = edge_crossing(&b, &a, plane.signed_distance(&b), plane.signed_distance(&a));
        assert_eq!(p, q);
    }

    #[test]
    fn test_plane_transform_keeps_distance() {
        let plane = Plane::horizontal(1.0);
        let t = Transform::rotation_x(0.4).then(&Transform::translation(&Vec3::new(1.0, 2.0, 3.0)));
        let moved = plane.transformed(&t);
        let p = Point3::new(0.5, -0.2, 4.0);
        assert_abs_diff_eq!(
            plane.signed_distance(&p),
            moved.signed_distance(&t.apply_point(&p)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_triangle() {
        let tri = Triangle::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        assert!(tri.is_degenerate());
        assert_eq!(tri.intersect_plane(&Plane::horizontal(0.0)), PlaneHit::Coplanar);
    }
}
