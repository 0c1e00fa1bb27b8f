//! Fill pattern generation: parallel lines alternating between +45° and
//! -45° from one layer to the next.

use tiltslice_math::Point2;

use crate::path::Polygon;

/// Line spacing for a fill density in percent; 100 % packs lines one nozzle
/// apart.
pub fn fill_spacing(density: f64, nozzle: f64) -> Option<f64> {
    (density > 0.0).then(|| nozzle * 100.0 / density.min(100.0))
}

/// Fill angle for a layer, in degrees.
pub fn fill_angle(layer_index: usize) -> f64 {
    if layer_index % 2 == 0 {
        45.0
    } else {
        -45.0
    }
}

/// Generate fill lines inside `boundaries`.
///
/// A point belongs to the region when it lies inside a counter-clockwise
/// boundary and outside every clockwise one, so holes stay empty. Returns
/// one segment per line piece.
pub fn generate_infill(
    boundaries: &[Polygon],
    density: f64,
    nozzle: f64,
    layer_index: usize,
) -> Vec<(Point2, Point2)> {
    let Some(spacing) = fill_spacing(density, nozzle) else {
        return Vec::new();
    };
    if boundaries.is_empty() {
        return Vec::new();
    }
    generate_parallel_lines(boundaries, spacing, fill_angle(layer_index).to_radians())
}

/// Generate parallel lines at specified angle within boundaries.
fn generate_parallel_lines(
    boundaries: &[Polygon],
    spacing: f64,
    angle: f64,
) -> Vec<(Point2, Point2)> {
    let (min, max) = compute_bounds(boundaries);

    let (sin_a, cos_a) = angle.sin_cos();
    // Direction along lines and across them.
    let dir = Point2::new(cos_a, sin_a);
    let perp = Point2::new(-sin_a, cos_a);

    let corners = [
        Point2::new(min.x, min.y),
        Point2::new(max.x, min.y),
        Point2::new(max.x, max.y),
        Point2::new(min.x, max.y),
    ];
    let (perp_min, perp_max) = corners.iter().fold((f64::MAX, f64::MIN), |(lo, hi), c| {
        let proj = c.x * perp.x + c.y * perp.y;
        (lo.min(proj), hi.max(proj))
    });

    let mut lines = Vec::new();
    let mut offset = perp_min + spacing / 2.0;
    while offset < perp_max {
        let origin = Point2::new(offset * perp.x, offset * perp.y);

        let mut hits = find_line_boundary_intersections(&origin, &dir, boundaries);
        hits.sort_by(|a, b| a.total_cmp(b));
        hits.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

        for pair in hits.windows(2) {
            let (t0, t1) = (pair[0], pair[1]);
            if t1 - t0 < 1e-9 {
                continue;
            }
            let p0 = Point2::new(origin.x + t0 * dir.x, origin.y + t0 * dir.y);
            let p1 = Point2::new(origin.x + t1 * dir.x, origin.y + t1 * dir.y);
            let mid = Point2::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);
            if is_point_inside_boundaries(&mid, boundaries) {
                lines.push((p0, p1));
            }
        }

        offset += spacing;
    }

    lines
}

/// Compute bounding box of polygons.
fn compute_bounds(polygons: &[Polygon]) -> (Point2, Point2) {
    let mut min = Point2::new(f64::MAX, f64::MAX);
    let mut max = Point2::new(f64::MIN, f64::MIN);
    for pt in polygons.iter().flat_map(|p| &p.points) {
        min.x = min.x.min(pt.x);
        min.y = min.y.min(pt.y);
        max.x = max.x.max(pt.x);
        max.y = max.y.max(pt.y);
    }
    (min, max)
}

/// Parameters along `origin + t · dir` where the line crosses a boundary
/// edge.
fn find_line_boundary_intersections(
    origin: &Point2,
    dir: &Point2,
    boundaries: &[Polygon],
) -> Vec<f64> {
    let mut intersections = Vec::new();
    let eps = 1e-10;

    for poly in boundaries {
        let n = poly.points.len();
        for i in 0..n {
            let a = &poly.points[i];
            let b = &poly.points[(i + 1) % n];
            let seg = Point2::new(b.x - a.x, b.y - a.y);

            let cross = dir.x * seg.y - dir.y * seg.x;
            if cross.abs() < eps {
                continue;
            }

            let diff = Point2::new(a.x - origin.x, a.y - origin.y);
            let t = (diff.x * seg.y - diff.y * seg.x) / cross;
            let s = (diff.x * dir.y - diff.y * dir.x) / cross;
            // Half-open so a line through a vertex is counted once.
            if (0.0..1.0).contains(&s) {
                intersections.push(t);
            }
        }
    }

    intersections
}

/// Inside some outer (CCW) boundary and outside all holes (CW).
fn is_point_inside_boundaries(point: &Point2, boundaries: &[Polygon]) -> bool {
    let mut inside_outer = false;
    for poly in boundaries {
        if poly.contains(point) {
            if poly.is_ccw() {
                inside_outer = true;
            } else {
                return false;
            }
        }
    }
    inside_outer
}
