//! Discretized-inclination slicing.
//!
//! The model is cut into bands of [`BAND_LAYERS`] layers. For every band
//! and candidate tilt the worst stair-step (cusp) height is computed, then
//! a dynamic program picks one tilt per band, minimising the worst band
//! error while keeping the number of tilted runs within the rotation
//! budget.

use rayon::prelude::*;
use tiltslice_math::{Orientation, Vec3};
use tiltslice_mesh::Mesh;
use tracing::{debug, info};

use super::{finish, prepare, slice_region, Region, SliceOutput};
use crate::command::{Command, InstructionStream};
use crate::error::Result;
use crate::layer::classify_layers;
use crate::settings::Settings;
use crate::slice::{layer_count, SliceMesh};

/// Layers per band.
pub const BAND_LAYERS: usize = 10;

/// Facets this close to parallel with the layers print without cusps.
const FLAT_FACET: f64 = 1.0 - 1e-6;

/// Slice choosing a tilt about X per band from `angles` (degrees).
///
/// Zero is always a candidate. At most `settings.rotation_budget` tilted
/// runs are printed, each bracketed by incline-on/rotate and
/// rotate-back/incline-off commands.
pub fn slice_discretized(mesh: &Mesh, angles: &[f64], settings: &Settings) -> Result<SliceOutput> {
    let (prepared, mut diagnostics) = prepare(mesh, settings)?;
    let mut stream = InstructionStream::new();
    let Some((z_min, z_max)) = prepared.z_range() else {
        return finish(stream, diagnostics);
    };

    let angles = candidate_angles(angles);
    let band_height = BAND_LAYERS as f64 * settings.layer_height;
    let band_count = layer_count(z_max - z_min, band_height);
    let bands: Vec<(f64, f64)> = (0..band_count)
        .map(|b| {
            let lo = z_min + b as f64 * band_height;
            let hi = if b + 1 == band_count {
                z_max
            } else {
                z_min + (b + 1) as f64 * band_height
            };
            (lo, hi)
        })
        .collect();

    let errors = band_errors(&prepared, &bands, &angles, settings.layer_height);
    let plan = plan_bands(&errors, &angles, settings.rotation_budget);

    let mut regions: Vec<Region> = Vec::new();
    for (&(lo, hi), &a) in bands.iter().zip(&plan) {
        let orientation = Orientation::new(angles[a], 0.0);
        match regions.last_mut() {
            Some(last) if last.orientation == orientation => last.z_hi = hi,
            _ => regions.push(Region {
                orientation,
                z_lo: lo,
                z_hi: hi,
            }),
        }
    }
    info!(
        bands = band_count,
        candidates = angles.len(),
        regions = regions.len(),
        "Inclination plan"
    );

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
            z_lo = region.z_lo,
            z_hi = region.z_hi,
            layers = layers.len(),
            "Inclination region"
        );
        if layers.is_empty() {
            continue;
        }
        if region.orientation.is_planar() {
            stream.push_layers(layers);
        } else {
            stream.push(Command::InclineOn);
            stream.push(Command::RotateXZ {
                angle_x: region.orientation.angle_x,
                angle_z: 0.0,
            });
            stream.push_layers(layers);
            stream.push(Command::RotateXZ {
                angle_x: 0.0,
                angle_z: 0.0,
            });
            stream.push(Command::InclineOff);
        }
    }

    finish(stream, diagnostics)
}

/// Sorted, deduplicated candidates with zero first.
fn candidate_angles(angles: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = angles.iter().copied().filter(|a| a.is_finite()).collect();
    out.push(0.0);
    out.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));
    out.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    // `0.0` sorts first by magnitude; make it exactly zero.
    out[0] = 0.0;
    out
}

/// `errors[band][angle]`: worst cusp height over the facets overlapping the
/// band when printed at that tilt.
fn band_errors(mesh: &SliceMesh, bands: &[(f64, f64)], angles: &[f64], h: f64) -> Vec<Vec<f64>> {
    let normals: Vec<Vec3> = angles
        .iter()
        .map(|&a| Orientation::new(a, 0.0).normal())
        .collect();
    let facets: Vec<(Vec3, f64, f64)> = mesh
        .triangles
        .iter()
        .filter_map(|t| {
            let n = t.normal()?;
            let z = t.vertices.map(|v| v.z);
            Some((n, z[0].min(z[1]).min(z[2]), z[0].max(z[1]).max(z[2])))
        })
        .collect();

    bands
        .par_iter()
        .map(|&(lo, hi)| {
            normals
                .iter()
                .map(|m| {
                    facets
                        .iter()
                        .filter(|(_, f_lo, f_hi)| *f_lo < hi && *f_hi > lo)
                        .map(|(n, _, _)| n.dot(m).abs())
                        .filter(|d| *d < FLAT_FACET)
                        .fold(0.0, |worst: f64, d| worst.max(h * d))
                })
                .collect()
        })
        .collect()
}

/// Lexicographic cost of a partial plan.
#[derive(Debug, Clone, Copy)]
struct Cost {
    worst: f64,
    total: f64,
    tilted_bands: usize,
}

impl Cost {
    fn better_than(&self, other: &Cost) -> bool {
        self.worst
            .total_cmp(&other.worst)
            .then(self.total.total_cmp(&other.total))
            .then(self.tilted_bands.cmp(&other.tilted_bands))
            .is_lt()
    }
}

/// Pick one candidate index per band.
///
/// Minimises the worst band error, then the summed error, then the number
/// of tilted bands, using at most `budget` runs of non-zero tilt. Index 0
/// must be the zero tilt; with no budget every band stays flat.
pub fn plan_bands(errors: &[Vec<f64>], angles: &[f64], budget: usize) -> Vec<usize> {
    let bands = errors.len();
    let count = angles.len();
    if bands == 0 || count == 0 {
        return Vec::new();
    }
    let runs = budget.min(bands);

    // best[band][angle][runs used]
    let mut best: Vec<Vec<Vec<Option<(Cost, usize)>>>> = vec![vec![vec![None; runs + 1]; count]; bands];

    for a in 0..count {
        let used = usize::from(a != 0);
        if used <= runs {
            let e = errors[0][a];
            best[0][a][used] = Some((
                Cost {
                    worst: e,
                    total: e,
                    tilted_bands: used,
                },
                usize::MAX,
            ));
        }
    }

    for b in 1..bands {
        for a in 0..count {
            let e = errors[b][a];
            for p in 0..count {
                let opens = a != 0 && a != p;
                for k in 0..=runs {
                    let Some((prev, _)) = best[b - 1][p][k] else {
                        continue;
                    };
                    let used = k + usize::from(opens);
                    if used > runs {
                        continue;
                    }
                    let cost = Cost {
                        worst: prev.worst.max(e),
                        total: prev.total + e,
                        tilted_bands: prev.tilted_bands + usize::from(a != 0),
                    };
                    let slot = &mut best[b][a][used];
                    if slot.map_or(true, |(c, _)| cost.better_than(&c)) {
                        *slot = Some((cost, p * (runs + 1) + k));
                    }
                }
            }
        }
    }

    let mut end: Option<(Cost, usize, usize)> = None;
    for a in 0..count {
        for k in 0..=runs {
            if let Some((cost, _)) = best[bands - 1][a][k] {
                if end.map_or(true, |(c, _, _)| cost.better_than(&c)) {
                    end = Some((cost, a, k));
                }
            }
        }
    }
    let Some((_, mut a, mut k)) = end else {
        return vec![0; bands];
    };

    let mut plan = vec![0; bands];
    for b in (0..bands).rev() {
        plan[b] = a;
        if b == 0 {
            break;
        }
        let Some((_, back)) = best[b][a][k] else {
            break;
        };
        a = back / (runs + 1);
        k = back % (runs + 1);
    }
    plan
}
