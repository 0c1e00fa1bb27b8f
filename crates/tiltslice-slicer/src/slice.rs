//! Mesh slicing: intersect triangles with horizontal planes and stitch the
//! segments into closed contours.
//!
//! Everything here works in the machine frame of the layer being cut, where
//! the cutting plane is horizontal.

use std::collections::HashMap;

use rayon::prelude::*;
use tiltslice_math::{Plane, PlaneHit, Point2, Triangle, STITCH_TOLERANCE};
use tiltslice_mesh::Mesh;

use crate::error::{Diagnostics, GeometryIssue};
use crate::path::Polygon;

/// Fraction of a layer height ignored when counting layers, so that an
/// extent of exactly `k` layer heights is not rounded up to `k + 1`.
pub const LAYER_ROUNDING_SLACK: f64 = 1e-6;

/// Contours with less area than this are dropped.
const MIN_CONTOUR_AREA: f64 = 1e-9;

/// A single layer from slicing.
#[derive(Debug, Clone)]
pub struct SliceLayer {
    /// Height of the cutting plane (mm).
    pub z: f64,
    /// Contours at this layer, largest first.
    /// Outer contours are CCW, holes are CW.
    pub contours: Vec<Polygon>,
}

/// Triangles of a mesh paired with their vertical extent, degenerate
/// facets removed.
#[derive(Debug, Clone, Default)]
pub struct SliceMesh {
    /// Facets with non-zero area.
    pub triangles: Vec<Triangle>,
    z_ranges: Vec<(f64, f64)>,
}

impl SliceMesh {
    /// Prepare `mesh` for cutting, recording every degenerate facet.
    pub fn new(mesh: &Mesh, diagnostics: &mut Diagnostics) -> Self {
        let mut triangles = Vec::with_capacity(mesh.len());
        for (index, tri) in mesh.triangles.iter().enumerate() {
            if tri.is_degenerate() {
                diagnostics.push(GeometryIssue::DegenerateTriangle { index });
            } else {
                triangles.push(*tri);
            }
        }
        Self::from_triangles(triangles)
    }

    /// Wrap already checked triangles.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        let z_ranges = triangles
            .iter()
            .map(|t| {
                let z = t.vertices.map(|v| v.z);
                (z[0].min(z[1]).min(z[2]), z[0].max(z[1]).max(z[2]))
            })
            .collect();
        Self {
            triangles,
            z_ranges,
        }
    }

    /// True when nothing is left to cut.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Lowest and highest vertex height.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        if self.z_ranges.is_empty() {
            return None;
        }
        Some(
            self.z_ranges
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), &(a, b)| (lo.min(a), hi.max(b))),
        )
    }

    /// Cut at height `z` and stitch the result; issues are tagged with
    /// `layer`.
    pub fn cut(&self, z: f64, layer: usize) -> (Vec<Polygon>, Diagnostics) {
        let plane = Plane::horizontal(z);
        let segments: Vec<(Point2, Point2)> = self
            .triangles
            .iter()
            .zip(&self.z_ranges)
            .filter(|(_, range)| range.0 <= z && range.1 >= z)
            .filter_map(|(tri, _)| match tri.intersect_plane(&plane) {
                PlaneHit::Segment(line) => Some((
                    Point2::new(line.p1.x, line.p1.y),
                    Point2::new(line.p2.x, line.p2.y),
                )),
                _ => None,
            })
            .collect();
        stitch(&segments, layer)
    }
}

/// Slice at several heights in parallel; layers come back in input order.
pub fn slice_mesh(
    mesh: &SliceMesh,
    heights: &[f64],
    first_layer: usize,
) -> (Vec<SliceLayer>, Diagnostics) {
    let cut: Vec<(SliceLayer, Diagnostics)> = heights
        .par_iter()
        .enumerate()
        .map(|(i, &z)| {
            let (contours, diag) = mesh.cut(z, first_layer + i);
            (SliceLayer { z, contours }, diag)
        })
        .collect();

    let mut diagnostics = Diagnostics::default();
    let layers = cut
        .into_iter()
        .map(|(layer, diag)| {
            diagnostics.extend(diag);
            layer
        })
        .collect();
    (layers, diagnostics)
}

/// Number of layers covering `extent`: at least one, and exactly `k` when
/// the extent is `k` layer heights.
pub fn layer_count(extent: f64, layer_height: f64) -> usize {
    let k = (extent / layer_height - LAYER_ROUNDING_SLACK).ceil();
    if k.is_finite() && k > 1.0 {
        k as usize
    } else {
        1
    }
}

/// Cutting heights for the slabs between `z_min` and `z_max`.
///
/// Slab `i` spans `[z_min + i·h, min(z_min + (i + 1)·h, z_max)]` and is cut
/// at its middle, so no plane ever runs through the bottom or top face.
pub fn generate_layer_heights(z_min: f64, z_max: f64, layer_height: f64) -> Vec<f64> {
    let k = layer_count(z_max - z_min, layer_height);
    (0..k)
        .map(|i| {
            let lo = z_min + i as f64 * layer_height;
            let hi = (z_min + (i + 1) as f64 * layer_height).min(z_max);
            (lo + hi.max(lo)) / 2.0
        })
        .collect()
}

fn cell(p: &Point2) -> (i64, i64) {
    (
        (p.x / STITCH_TOLERANCE).round() as i64,
        (p.y / STITCH_TOLERANCE).round() as i64,
    )
}

/// Chain segments into closed contours by their shared endpoints.
///
/// Either end of a segment may join a chain within [`STITCH_TOLERANCE`],
/// so a facet with the wrong winding does not break its contour. Once
/// closed, each contour is wound by nesting depth: outer boundaries
/// counter-clockwise, holes clockwise, islands in holes counter-clockwise
/// again. Chains that never close and contours without area are dropped
/// and reported.
fn stitch(segments: &[(Point2, Point2)], layer: usize) -> (Vec<Polygon>, Diagnostics) {
    let mut diagnostics = Diagnostics::default();
    let mut ends: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        ends.entry(cell(a)).or_default().push(i);
        ends.entry(cell(b)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    // Unused segment touching `at`, with its far end.
    let find_next = |at: &Point2, used: &[bool]| -> Option<(usize, Point2)> {
        let (cx, cy) = cell(at);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(candidates) = ends.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &i in candidates {
                    if used[i] {
                        continue;
                    }
                    let (a, b) = segments[i];
                    if (a - *at).norm() <= STITCH_TOLERANCE {
                        return Some((i, b));
                    }
                    if (b - *at).norm() <= STITCH_TOLERANCE {
                        return Some((i, a));
                    }
                }
            }
        }
        None
    };

    let mut contours = Vec::new();
    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let start = segments[first].0;
        let mut chain = vec![start];
        let mut end = segments[first].1;
        let mut closed = false;
        let mut count = 1;

        loop {
            if (end - start).norm() <= STITCH_TOLERANCE && count > 1 {
                closed = true;
                break;
            }
            chain.push(end);
            match find_next(&end, &used) {
                Some((next, far)) => {
                    used[next] = true;
                    count += 1;
                    end = far;
                }
                None => break,
            }
        }

        if !closed {
            // Claim the rest of the broken chain so it is reported once.
            let mut head = start;
            while let Some((next, far)) = find_next(&head, &used) {
                used[next] = true;
                count += 1;
                head = far;
            }
            diagnostics.push(GeometryIssue::OpenContour {
                layer,
                segments: count,
            });
            continue;
        }

        let polygon = Polygon::new(chain);
        if polygon.distinct_len() < 3 || polygon.signed_area().abs() < MIN_CONTOUR_AREA {
            diagnostics.push(GeometryIssue::DegenerateContour { layer });
            continue;
        }
        contours.push(polygon);
    }

    orient_by_nesting(&mut contours);
    contours.sort_by(|a, b| b.signed_area().abs().total_cmp(&a.signed_area().abs()));
    (contours, diagnostics)
}

/// Wind every contour by how many others enclose it: even depth
/// counter-clockwise, odd depth clockwise.
fn orient_by_nesting(contours: &mut [Polygon]) {
    let depths: Vec<usize> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            let sample = contour.points[0];
            contours
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && other.contains(&sample))
                .count()
        })
        .collect();

    for (contour, depth) in contours.iter_mut().zip(depths) {
        if contour.is_ccw() != (depth % 2 == 0) {
            contour.points.reverse();
        }
    }
}
