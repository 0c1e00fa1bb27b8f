//! Douglas–Peucker simplification of printed paths.

use tiltslice_math::{Path, Point3};

/// Simplify a path, dropping points that deviate at most `epsilon` from the
/// chord between the points kept around them.
///
/// Open paths keep both endpoints. Closed paths keep their seam (the first
/// point) and stay closed. The result never has more lines than the input.
pub fn simplify_path(path: &Path, epsilon: f64) -> Path {
    let points = path.points();
    if points.len() <= 2 {
        return path.clone();
    }
    if path.is_closed() {
        Path::from_points(&simplify_closed(&points, epsilon))
    } else {
        Path::from_points(&simplify_points(&points, epsilon))
    }
}

/// Simplify an open polyline. Endpoints are always kept.
pub fn simplify_points(points: &[Point3], epsilon: f64) -> Vec<Point3> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let (index, deviation) = farthest(&points[first..=last], |p| {
            segment_distance(p, &points[first], &points[last])
        });
        let index = first + index;
        if deviation > epsilon {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Simplify a closed loop given with its seam repeated at the end.
///
/// The loop is split at the seam and at the vertex farthest from it; each
/// half is simplified on its own.
fn simplify_closed(points: &[Point3], epsilon: f64) -> Vec<Point3> {
    let seam = points[0];
    let (split, _) = farthest(points, |p| tiltslice_math::distance(p, &seam));
    if split == 0 || split == points.len() - 1 {
        return points.to_vec();
    }
    let mut out = simplify_points(&points[..=split], epsilon);
    out.pop();
    out.extend(simplify_points(&points[split..], epsilon));
    out
}

/// Index and value of the largest `measure` over interior points; the
/// first one wins on ties.
fn farthest(points: &[Point3], measure: impl Fn(&Point3) -> f64) -> (usize, f64) {
    let mut best = (0, f64::MIN);
    for (i, p) in points.iter().enumerate().skip(1).take(points.len().saturating_sub(2)) {
        let d = measure(p);
        if d > best.1 {
            best = (i, d);
        }
    }
    best
}

/// Distance from `p` to the segment `a`–`b`.
pub fn segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}
