//! Profile-guided slicing: the planes file assigns a bed orientation to
//! each height range of the model.

use tiltslice_math::Orientation;
use tiltslice_mesh::Mesh;
use tracing::debug;

use super::{finish, prepare, slice_region, Region, SliceOutput};
use crate::command::{Command, InstructionStream};
use crate::error::Result;
use crate::layer::classify_layers;
use crate::planes::PlaneDescriptor;
use crate::settings::Settings;

/// Tilts below this many degrees are printed flat.
pub const ANGLE_SNAP: f64 = 0.5;

/// Heights closer than this are the same region start.
const SAME_HEIGHT: f64 = 1e-9;

/// Slice following `planes`.
///
/// Each descriptor with an `at` height starts a region that runs to the
/// next one. Descriptors without a height are ignored. Below the first
/// start, where two descriptors disagree at the same height, and for tilts
/// under [`ANGLE_SNAP`], layers are planar.
pub fn slice_by_profile(
    mesh: &Mesh,
    planes: &[PlaneDescriptor],
    settings: &Settings,
) -> Result<SliceOutput> {
    let (prepared, mut diagnostics) = prepare(mesh, settings)?;
    let mut stream = InstructionStream::new();
    let Some((z_min, z_max)) = prepared.z_range() else {
        return finish(stream, diagnostics);
    };

    let regions = profile_regions(planes, z_min, z_max);
    let mut current = Orientation::PLANAR;
    for region in &regions {
        let slices = slice_region(
            &prepared,
            region,
            settings,
            stream.layer_count(),
            &mut diagnostics,
        );
        let layers = classify_layers(&slices, stream.layer_count(), settings);
        debug!(
            angle_x = region.orientation.angle_x,
            angle_z = region.orientation.angle_z,
            z_lo = region.z_lo,
            z_hi = region.z_hi,
            layers = layers.len(),
            "Profile region"
        );
        if layers.is_empty() {
            continue;
        }
        if region.orientation != current {
            stream.push(Command::RotateXZ {
                angle_x: region.orientation.angle_x,
                angle_z: region.orientation.angle_z,
            });
            current = region.orientation;
        }
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

/// Split `[z_min, z_max]` into regions following the descriptors.
/// Adjacent regions with the same orientation are merged.
fn profile_regions(planes: &[PlaneDescriptor], z_min: f64, z_max: f64) -> Vec<Region> {
    let mut starts: Vec<(f64, Orientation)> = planes
        .iter()
        .filter_map(|p| p.at.map(|z| (z, p.orientation)))
        .collect();
    starts.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Resolve descriptors sharing a height.
    let mut resolved: Vec<(f64, Orientation)> = Vec::with_capacity(starts.len());
    for (z, orientation) in starts {
        match resolved.last_mut() {
            Some(last) if (last.0 - z).abs() <= SAME_HEIGHT => {
                if last.1 != orientation {
                    last.1 = Orientation::PLANAR;
                }
            }
            _ => resolved.push((z, orientation)),
        }
    }

    let mut bounds = vec![(z_min, Orientation::PLANAR)];
    bounds.extend(resolved);

    let mut regions: Vec<Region> = Vec::new();
    for (i, &(z, orientation)) in bounds.iter().enumerate() {
        let z_lo = z.max(z_min);
        let z_hi = bounds.get(i + 1).map_or(z_max, |next| next.0).min(z_max);
        if z_hi <= z_lo {
            continue;
        }
        let orientation = if orientation.tilt() < ANGLE_SNAP {
            Orientation::PLANAR
        } else {
            orientation
        };
        match regions.last_mut() {
            Some(last) if last.orientation == orientation => last.z_hi = z_hi,
            _ => regions.push(Region {
                orientation,
                z_lo,
                z_hi,
            }),
        }
    }
    regions
}
