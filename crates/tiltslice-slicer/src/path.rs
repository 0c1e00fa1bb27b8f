//! Layer contours and toolpath ordering.
//!
//! A [`Polygon`] is a closed contour in the plane of one layer, without the
//! closing point repeated. Contours follow the cutting convention: walking
//! along the contour, material is on the left, so outer boundaries are
//! counter-clockwise and holes clockwise.

use tiltslice_math::{Path, Point2, Point3};

/// A closed 2D contour.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices in order, the closing edge back to the first is implied.
    pub points: Vec<Point2>,
}

impl Polygon {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area of the polygon.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Is the polygon counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Perimeter length, closing edge included.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| (self.points[(i + 1) % n] - self.points[i]).norm())
            .sum()
    }

    /// Area centroid, falling back to the vertex average for degenerate
    /// polygons.
    pub fn centroid(&self) -> Point2 {
        let n = self.points.len();
        if n == 0 {
            return Point2::origin();
        }
        let area = self.signed_area();
        if area.abs() < 1e-12 {
            let sum = self
                .points
                .iter()
                .fold(Point2::origin().coords, |acc, p| acc + p.coords);
            return Point2::from(sum / n as f64);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        Point2::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    /// Count of distinct vertices, comparing neighbours only.
    pub fn distinct_len(&self) -> usize {
        let n = self.points.len();
        (0..n)
            .filter(|&i| self.points[i] != self.points[(i + 1) % n])
            .count()
    }

    /// Even–odd point containment.
    pub fn contains(&self, point: &Point2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = &self.points[i];
            let pj = &self.points[j];
            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// The same contour without repeated or collinear vertices.
    ///
    /// Points closer than `tolerance` to their predecessor are merged and
    /// vertices where the contour runs straight on (or doubles back) are
    /// removed, so the seam always lands on a real corner.
    pub fn cleaned(&self, tolerance: f64) -> Self {
        let mut pts: Vec<Point2> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if pts.last().map_or(true, |q| (p - q).norm() > tolerance) {
                pts.push(*p);
            }
        }
        while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() <= tolerance {
            pts.pop();
        }

        loop {
            let n = pts.len();
            if n < 3 {
                break;
            }
            let straight = (0..n).find(|&i| {
                let a = pts[i] - pts[(i + n - 1) % n];
                let b = pts[(i + 1) % n] - pts[i];
                let cross = a.x * b.y - a.y * b.x;
                cross.abs() <= COLLINEAR_TOLERANCE * a.norm() * b.norm()
            });
            match straight {
                Some(i) => {
                    pts.remove(i);
                }
                None => break,
            }
        }
        Self { points: pts }
    }

    /// Offset every edge by `distance` toward the material side.
    ///
    /// Outer contours shrink and holes grow. Edges too short to survive the
    /// offset are collapsed into their neighbours. Returns `None` when the
    /// whole result collapses or turns inside out.
    pub fn offset(&self, distance: f64) -> Option<Self> {
        let mut pts = self.cleaned(OFFSET_MERGE_TOLERANCE).points;

        loop {
            let n = pts.len();
            if n < 3 {
                return None;
            }
            let offset_points = offset_vertices(&pts, distance);

            // An edge that flipped direction was shorter than the offset.
            let flipped = (0..n).find(|&i| {
                let j = (i + 1) % n;
                (offset_points[j] - offset_points[i]).dot(&(pts[j] - pts[i])) <= 0.0
            });
            if let Some(i) = flipped {
                pts.remove((i + 1) % n);
                continue;
            }

            let result = Polygon::new(offset_points);
            let before = Polygon::new(pts).signed_area();
            let after = result.signed_area();
            if after.abs() < 1e-9 || after.signum() != before.signum() {
                return None;
            }
            // An outer contour offset inward must shrink.
            if before > 0.0 && distance > 0.0 && after >= before {
                return None;
            }
            return Some(result);
        }
    }

    /// Keep the part of the polygon where `side` is non-negative
    /// (Sutherland–Hodgman against one affine half-plane).
    ///
    /// Returns `None` when fewer than three vertices survive.
    pub fn clip(&self, side: impl Fn(&Point2) -> f64) -> Option<Self> {
        let n = self.points.len();
        if n == 0 {
            return None;
        }
        let d: Vec<f64> = self.points.iter().map(&side).collect();
        if d.iter().all(|&x| x >= 0.0) {
            return Some(self.clone());
        }

        let mut out = Vec::with_capacity(n + 2);
        for i in 0..n {
            let j = (i + 1) % n;
            let (a, b) = (self.points[i], self.points[j]);
            let (da, db) = (d[i], d[j]);
            if da >= 0.0 {
                out.push(a);
            }
            if (da >= 0.0) != (db >= 0.0) {
                let t = da / (da - db);
                out.push(a + (b - a) * t);
            }
        }
        out.dedup();
        let poly = Polygon::new(out);
        (poly.distinct_len() >= 3 && poly.signed_area().abs() > 1e-12).then_some(poly)
    }

    /// Lift into a closed 3D path at height `z`.
    pub fn to_path(&self, z: f64) -> Path {
        let pts: Vec<Point3> = self.points.iter().map(|p| Point3::new(p.x, p.y, z)).collect();
        Path::closed_from_points(&pts)
    }

    /// Project a closed 3D path back onto the layer plane.
    pub fn from_path(path: &Path) -> Self {
        let mut points: Vec<Point2> = path.points().iter().map(|p| Point2::new(p.x, p.y)).collect();
        if path.is_closed() {
            points.pop();
        }
        Self { points }
    }
}

/// Vertices may not turn by less than this (as a sine) and stay.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Vertices this close are merged before offsetting.
const OFFSET_MERGE_TOLERANCE: f64 = 1e-9;

/// Move every vertex along its corner bisector so both adjacent edges end
/// up `distance` to their left, with the miter capped at twice the distance.
fn offset_vertices(pts: &[Point2], distance: f64) -> Vec<Point2> {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let p0 = pts[(i + n - 1) % n];
            let p1 = pts[i];
            let p2 = pts[(i + 1) % n];

            let e1 = (p1 - p0).normalize();
            let e2 = (p2 - p1).normalize();
            // Left normals point into the material.
            let n1 = nalgebra::Vector2::new(-e1.y, e1.x);
            let n2 = nalgebra::Vector2::new(-e2.y, e2.x);

            let sum = n1 + n2;
            let bisector = if sum.norm() < 1e-9 { n1 } else { sum.normalize() };

            let dot = n1.dot(&bisector);
            let miter = if dot.abs() > 1e-3 { distance / dot } else { distance };
            let limit = distance.abs() * 2.0;
            p1 + bisector * miter.clamp(-limit, limit)
        })
        .collect()
}

/// Reorder paths to shorten travel, greedily jumping to the nearest start.
///
/// Open paths may be reversed when their end is closer. Returns the
/// reordered paths and the position after the last one.
pub fn order_nearest(paths: Vec<Path>, from: Point3) -> (Vec<Path>, Point3) {
    let mut remaining: Vec<Path> = paths;
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = from;

    while !remaining.is_empty() {
        let mut best = (0, false, f64::MAX);
        for (i, path) in remaining.iter().enumerate() {
            if let Some(start) = path.start() {
                let d = (start - current).norm_squared();
                if d < best.2 {
                    best = (i, false, d);
                }
            }
            if !path.is_closed() {
                if let Some(end) = path.end() {
                    let d = (end - current).norm_squared();
                    if d < best.2 {
                        best = (i, true, d);
                    }
                }
            }
        }

        let path = remaining.swap_remove(best.0);
        let path = if best.1 { path.reversed() } else { path };
        if let Some(end) = path.end() {
            current = end;
        }
        ordered.push(path);
    }

    (ordered, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ])
    }

    #[test]
    fn test_polygon_area() {
        let sq = square(1.0);
        assert_abs_diff_eq!(sq.signed_area(), 1.0, epsilon = 1e-12);
        assert!(sq.is_ccw());
        assert_abs_diff_eq!(sq.perimeter(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid() {
        let c = square(10.0).centroid();
        assert_abs_diff_eq!(c.x, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = square(10.0);
        assert!(sq.contains(&Point2::new(5.0, 5.0)));
        assert!(!sq.contains(&Point2::new(15.0, 5.0)));
        assert!(!sq.contains(&Point2::new(-1.0, 5.0)));
    }

    #[test]
    fn test_offset_shrinks_outer() {
        let offset = square(10.0).offset(1.0).unwrap();
        assert_abs_diff_eq!(offset.signed_area(), 64.0, epsilon = 1e-9);
        assert_abs_diff_eq!(offset.points[0].x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(offset.points[0].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_grows_hole() {
        let mut hole = square(4.0);
        hole.points.reverse();
        let grown = hole.offset(1.0).unwrap();
        assert_abs_diff_eq!(grown.signed_area(), -36.0, epsilon = 1e-9);
    }

    #[test]
    fn test_offset_collapse() {
        assert!(square(1.0).offset(0.6).is_none());
    }

    #[test]
    fn test_cleaned_moves_seam_to_corner() {
        // Cut contour of a cube side: seam 0.1 from a corner, diagonal
        // crossings on every side.
        let contour = Polygon::new(vec![
            Point2::new(0.1, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 0.1),
            Point2::new(10.0, 10.0),
            Point2::new(9.9, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 9.9),
            Point2::new(0.0, 0.0),
        ]);
        let cleaned = contour.cleaned(1e-6);
        assert_eq!(cleaned.len(), 4);
        assert_abs_diff_eq!(cleaned.signed_area(), 100.0, epsilon = 1e-9);

        let inner = contour.offset(0.4).unwrap();
        assert_eq!(inner.len(), 4);
        assert_abs_diff_eq!(inner.signed_area(), 9.2 * 9.2, epsilon = 1e-9);
    }

    #[test]
    fn test_offset_collapses_short_edge() {
        let chamfered = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 9.9),
            Point2::new(9.9, 10.0),
            Point2::new(0.0, 10.0),
        ]);
        let inner = chamfered.offset(0.4).unwrap();
        assert_eq!(inner.len(), 4);
        let area = inner.signed_area();
        assert!(area > 80.0 && area < 9.2 * 9.2, "{area}");
    }

    #[test]
    fn test_clip_half_plane() {
        let clipped = square(10.0).clip(|p| 4.0 - p.x).unwrap();
        assert_abs_diff_eq!(clipped.signed_area(), 40.0, epsilon = 1e-9);
        assert!(square(10.0).clip(|p| p.x - 20.0).is_none());
        assert_eq!(square(10.0).clip(|p| p.x + 1.0).unwrap(), square(10.0));
    }

    #[test]
    fn test_path_round_trip() {
        let path = square(3.0).to_path(1.5);
        assert!(path.is_closed());
        assert_eq!(path.len(), 4);
        assert_abs_diff_eq!(path.length(), 12.0, epsilon = 1e-12);
        assert_eq!(Polygon::from_path(&path), square(3.0));
    }

    #[test]
    fn test_order_nearest_reverses_open_paths() {
        let far = Path::from_points(&[Point3::new(10.0, 0.0, 0.0), Point3::new(11.0, 0.0, 0.0)]);
        let near = Path::from_points(&[Point3::new(5.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        let (ordered, end) = order_nearest(vec![far, near], Point3::origin());
        assert_eq!(ordered[0].start(), Some(Point3::new(1.0, 0.0, 0.0)));
        assert_eq!(ordered[1].start(), Some(Point3::new(10.0, 0.0, 0.0)));
        assert_eq!(end, Point3::new(11.0, 0.0, 0.0));
    }
}
