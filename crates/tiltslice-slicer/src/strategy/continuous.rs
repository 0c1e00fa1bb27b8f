//! Continuous multi-axis slicing.
//!
//! Cutting planes march up the model one layer at a time. After each layer
//! the plane normal is steered toward the line joining the centroid of the
//! current cross-section and the centroid of a cross-section a few layers
//! ahead, so layers follow the model's lean instead of stair-stepping.
//!
//! The centroid axis is the only measure of local shape used here. Facet
//! normals and surface curvature do not enter the steering, so a part that
//! bulges without leaning is sliced flat.

use std::collections::HashMap;

use nalgebra::{Rotation3, Unit};
use tiltslice_math::{Orientation, Plane, Point2, Point3, Transform, Vec3};
use tiltslice_mesh::Mesh;
use tracing::debug;

use super::{finish, prepare, SliceOutput};
use crate::command::{Command, InstructionStream};
use crate::error::{Diagnostics, Result};
use crate::layer::classify_layers;
use crate::path::Polygon;
use crate::settings::Settings;
use crate::slice::{layer_count, SliceLayer, SliceMesh};

/// How many layers ahead the steering cross-section is taken.
pub const LOOKAHEAD_LAYERS: usize = 5;

/// Largest change of the layer normal between two layers (degrees).
pub const MAX_TILT_STEP: f64 = 2.0;

/// Largest angle between the layer normal and the vertical (degrees).
pub const MAX_TILT: f64 = 60.0;

/// Orientations are rounded to this many degrees.
const ANGLE_QUANTUM: f64 = 1.0;

/// Hard cap on layers, as a multiple of the planar layer count.
const LAYER_CAP_FACTOR: usize = 4;

/// The mesh seen from one bed orientation.
struct Frame {
    transform: Transform,
    inverse: Transform,
    mesh: SliceMesh,
}

impl Frame {
    fn new(mesh: &SliceMesh, orientation: &Orientation, center: &Point3) -> Self {
        let transform = orientation.machine_transform(center);
        let inverse = transform.inverse().unwrap_or_default();
        let mesh = SliceMesh::from_triangles(
            mesh.triangles.iter().map(|t| t.transformed(&transform)).collect(),
        );
        Self {
            transform,
            inverse,
            mesh,
        }
    }

    /// World-space centroid of the cross-section at machine height `z`.
    fn centroid(&self, contours: &[Polygon], z: f64) -> Option<Point3> {
        let area: f64 = contours.iter().map(Polygon::signed_area).sum();
        if area.abs() < 1e-9 {
            return None;
        }
        let weighted = contours.iter().fold(Point2::origin().coords, |acc, c| {
            acc + c.centroid().coords * c.signed_area()
        });
        let c = weighted / area;
        Some(self.inverse.apply_point(&Point3::new(c.x, c.y, z)))
    }
}

fn frame_key(orientation: &Orientation) -> (i64, i64) {
    (
        orientation.angle_x.round() as i64,
        orientation.angle_z.round() as i64,
    )
}

/// Slice with a continuously steered layer normal.
///
/// Every layer is cut in its own machine frame and clipped by the previous
/// cutting plane. Consecutive layers sharing an orientation form a batch;
/// between batches the bed turns about Z alone when only the azimuth
/// changes.
pub fn slice_continuous(mesh: &Mesh, settings: &Settings) -> Result<SliceOutput> {
    let (prepared, mut diagnostics) = prepare(mesh, settings)?;
    let mut stream = InstructionStream::new();
    let Some((z_min, z_max)) = prepared.z_range() else {
        return finish(stream, diagnostics);
    };

    let slices = march(&prepared, z_min, z_max, settings, &mut diagnostics);

    let mut current = Orientation::PLANAR;
    let mut start = 0;
    while start < slices.len() {
        let orientation = slices[start].0;
        let end = slices[start..]
            .iter()
            .position(|(o, _)| *o != orientation)
            .map_or(slices.len(), |n| start + n);
        let batch: Vec<SliceLayer> = slices[start..end].iter().map(|(_, s)| s.clone()).collect();
        start = end;

        let layers = classify_layers(&batch, stream.layer_count(), settings);
        if layers.is_empty() {
            continue;
        }
        if orientation != current {
            if orientation.angle_x == current.angle_x {
                stream.push(Command::RotateZ {
                    angle: orientation.angle_z,
                });
            } else {
                stream.push(Command::RotateXZ {
                    angle_x: orientation.angle_x,
                    angle_z: orientation.angle_z,
                });
            }
            current = orientation;
        }
        debug!(
            angle_x = orientation.angle_x,
            angle_z = orientation.angle_z,
            layers = layers.len(),
            "Continuous batch"
        );
        stream.push_layers(layers);
    }
    if !current.is_planar() {
        stream.push(Command::RotateXZ {
            angle_x: 0.0,
            angle_z: 0.0,
        });
    }

    finish(stream, diagnostics)
}

/// Cut layers bottom to top, returning each non-empty one with the
/// orientation it was cut in.
fn march(
    mesh: &SliceMesh,
    z_min: f64,
    z_max: f64,
    settings: &Settings,
    diagnostics: &mut Diagnostics,
) -> Vec<(Orientation, SliceLayer)> {
    let h = settings.layer_height;
    let center = settings.rotation_center;
    let cap = LAYER_CAP_FACTOR * layer_count(z_max - z_min, h);
    let vertices: Vec<Point3> = mesh.triangles.iter().flat_map(|t| t.vertices).collect();

    let mut frames: HashMap<(i64, i64), Frame> = HashMap::new();
    let mut orientation = Orientation::PLANAR;
    let mut origin = Point3::new(center.x, center.y, z_min + h / 2.0);
    let mut previous: Option<Plane> = None;
    let mut slices = Vec::new();

    for step in 0..cap {
        let normal = orientation.normal();
        let Some(plane) = Plane::new(origin, normal) else {
            break;
        };
        if vertices.iter().all(|v| plane.signed_distance(v) <= 0.0) {
            break;
        }

        let frame = frames
            .entry(frame_key(&orientation))
            .or_insert_with(|| Frame::new(mesh, &orientation, &center));
        let z = frame.transform.apply_point(&origin).z;
        let (mut contours, diag) = frame.mesh.cut(z, step);
        diagnostics.extend(diag);

        if let Some(prev) = previous {
            let below = prev.transformed(&frame.transform);
            contours = contours
                .iter()
                .filter_map(|c| c.clip(|p| below.signed_distance(&Point3::new(p.x, p.y, z))))
                .collect();
        }

        let here = frame.centroid(&contours, z);
        let ahead_z = z + LOOKAHEAD_LAYERS as f64 * h;
        let (ahead_contours, _) = frame.mesh.cut(ahead_z, step);
        let ahead = frame.centroid(&ahead_contours, ahead_z);

        if !contours.is_empty() {
            slices.push((orientation, SliceLayer { z, contours }));
        }

        let next_normal = match (here, ahead) {
            (Some(a), Some(b)) => steer(&normal, &(b - a)),
            _ => normal,
        };
        let on_plane = here.map_or(origin, |c| c - normal * plane.signed_distance(&c));
        origin = on_plane + normal * h;
        previous = Some(plane);
        orientation = Orientation::from_normal(&next_normal).quantized(ANGLE_QUANTUM);
    }

    slices
}

/// Turn `current` toward `desired` by at most [`MAX_TILT_STEP`], keeping
/// the result within [`MAX_TILT`] of vertical.
fn steer(current: &Vec3, desired: &Vec3) -> Vec3 {
    if desired.z <= 0.0 || desired.norm() < 1e-12 {
        return *current;
    }
    let desired = desired.normalize();
    let max_step = MAX_TILT_STEP.to_radians();
    let mut next = if current.angle(&desired) <= max_step {
        desired
    } else {
        match Unit::try_new(current.cross(&desired), 1e-12) {
            Some(axis) => Rotation3::from_axis_angle(&axis, max_step) * current,
            None => *current,
        }
    };

    let max_tilt = MAX_TILT.to_radians();
    if next.z.clamp(-1.0, 1.0).acos() > max_tilt {
        let horizontal = Vec3::new(next.x, next.y, 0.0);
        if let Some(h) = horizontal.try_normalize(1e-12) {
            next = h * max_tilt.sin() + Vec3::z() * max_tilt.cos();
        }
    }
    next
}
