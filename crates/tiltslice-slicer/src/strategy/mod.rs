//! Slicing strategies.
//!
//! Every strategy turns a mesh into an [`InstructionStream`]: layer batches
//! interleaved with the bed rotations that put each batch's layer normal
//! straight up. The model is split into regions delimited by horizontal
//! world planes. Each region is sliced in its own machine frame and its
//! layers are clipped back to the region so regions neither overlap nor
//! leave gaps.

mod continuous;
mod inclination;
mod planar;
mod profile;

use std::fmt;
use std::str::FromStr;

use tiltslice_math::{Orientation, Plane, Point3};
use tiltslice_mesh::Mesh;
use tracing::{info, warn};

use crate::command::InstructionStream;
use crate::error::{Diagnostics, Result, SlicerError};
use crate::planes::load_planes;
use crate::settings::Settings;
use crate::slice::{generate_layer_heights, slice_mesh, SliceLayer, SliceMesh};

pub use continuous::{slice_continuous, LOOKAHEAD_LAYERS, MAX_TILT, MAX_TILT_STEP};
pub use inclination::{plan_bands, slice_discretized, BAND_LAYERS};
pub use planar::slice_planar;
pub use profile::{slice_by_profile, ANGLE_SNAP};

/// Available slicing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Horizontal layers only.
    Planar,
    /// Orientation per height range, read from the planes file.
    ProfileGuided,
    /// Layer normal steered continuously along the model.
    Continuous,
    /// Best angle per band from a discrete candidate set, with a bounded
    /// number of rotations.
    DiscretizedInclination,
}

impl Strategy {
    /// All strategies.
    pub const ALL: [Strategy; 4] = [
        Strategy::Planar,
        Strategy::ProfileGuided,
        Strategy::Continuous,
        Strategy::DiscretizedInclination,
    ];

    /// Identifier accepted on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::Planar => "3axes",
            Strategy::ProfileGuided => "5axes_by_profile",
            Strategy::Continuous => "5axes",
            Strategy::DiscretizedInclination => "vip",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Strategy {
    type Err = SlicerError;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.id() == s)
            .ok_or_else(|| SlicerError::UnknownStrategy(s.to_string()))
    }
}

/// What a strategy produces.
#[derive(Debug, Clone, Default)]
pub struct SliceOutput {
    /// Commands to emit.
    pub stream: InstructionStream,
    /// Geometry problems recovered from along the way.
    pub diagnostics: Diagnostics,
}

/// Slice `mesh` with `strategy`.
///
/// The profile-guided and discretized-inclination strategies read
/// `settings.planes_file`.
pub fn slice(mesh: &Mesh, strategy: Strategy, settings: &Settings) -> Result<SliceOutput> {
    info!(strategy = %strategy, triangles = mesh.len(), "Slicing");
    let output = match strategy {
        Strategy::Planar => slice_planar(mesh, settings)?,
        Strategy::ProfileGuided => {
            let planes = load_planes(&settings.planes_file)?;
            slice_by_profile(mesh, &planes, settings)?
        }
        Strategy::Continuous => slice_continuous(mesh, settings)?,
        Strategy::DiscretizedInclination => {
            let planes = load_planes(&settings.planes_file)?;
            let angles: Vec<f64> = planes.iter().map(|p| p.orientation.angle_x).collect();
            slice_discretized(mesh, &angles, settings)?
        }
    };
    info!(
        strategy = %strategy,
        layers = output.stream.layer_count(),
        batches = output.stream.batch_sizes().len(),
        "Slicing finished"
    );
    Ok(output)
}

/// Validate settings and drop degenerate facets.
pub(crate) fn prepare(mesh: &Mesh, settings: &Settings) -> Result<(SliceMesh, Diagnostics)> {
    settings.validate()?;
    if mesh.is_empty() {
        return Err(SlicerError::EmptyMesh);
    }
    let mut diagnostics = Diagnostics::default();
    let prepared = SliceMesh::new(mesh, &mut diagnostics);
    if prepared.is_empty() {
        return Err(SlicerError::EmptyMesh);
    }
    Ok((prepared, diagnostics))
}

/// Reject empty results and report recovered issues.
pub(crate) fn finish(stream: InstructionStream, diagnostics: Diagnostics) -> Result<SliceOutput> {
    if stream.is_empty() {
        return Err(SlicerError::SliceFailed("no printable layers".into()));
    }
    if !diagnostics.is_clean() {
        warn!(issues = diagnostics.len(), summary = %diagnostics, "Recovered geometry issues");
    }
    Ok(SliceOutput {
        stream,
        diagnostics,
    })
}

/// A height range of the model printed with one bed orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Region {
    pub orientation: Orientation,
    /// World height where the region starts.
    pub z_lo: f64,
    /// World height where the region ends.
    pub z_hi: f64,
}

/// Slice one region in its machine frame.
///
/// Layers are clipped to the world slab `[z_lo, z_hi]`; empty layers are
/// dropped. `first_layer` only tags diagnostics.
pub(crate) fn slice_region(
    mesh: &SliceMesh,
    region: &Region,
    settings: &Settings,
    first_layer: usize,
    diagnostics: &mut Diagnostics,
) -> Vec<SliceLayer> {
    let h = settings.layer_height;
    if region.z_hi <= region.z_lo {
        return Vec::new();
    }

    if region.orientation.is_planar() {
        let heights = generate_layer_heights(region.z_lo, region.z_hi, h);
        let (layers, diag) = slice_mesh(mesh, &heights, first_layer);
        diagnostics.extend(diag);
        return layers.into_iter().filter(|l| !l.contours.is_empty()).collect();
    }

    let transform = region.orientation.machine_transform(&settings.rotation_center);
    let machine = SliceMesh::from_triangles(
        mesh.triangles.iter().map(|t| t.transformed(&transform)).collect(),
    );
    let Some((z_min, z_max)) = machine.z_range() else {
        return Vec::new();
    };
    let lower = Plane::horizontal(region.z_lo).transformed(&transform);
    let upper = Plane::horizontal(region.z_hi).transformed(&transform).flipped();

    let heights = generate_layer_heights(z_min, z_max, h);
    let (layers, diag) = slice_mesh(&machine, &heights, first_layer);
    diagnostics.extend(diag);

    layers
        .into_iter()
        .filter_map(|layer| {
            let z = layer.z;
            let contours: Vec<_> = layer
                .contours
                .iter()
                .filter_map(|c| {
                    c.clip(|p| lower.signed_distance(&Point3::new(p.x, p.y, z)))
                        .and_then(|c| c.clip(|p| upper.signed_distance(&Point3::new(p.x, p.y, z))))
                })
                .collect();
            (!contours.is_empty()).then_some(SliceLayer { z, contours })
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_strategy_ids() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.id().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("vip".parse::<Strategy>().unwrap(), Strategy::DiscretizedInclination);
        let err = "4axes".parse::<Strategy>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let err = slice(&Mesh::default(), Strategy::Planar, &Settings::default()).unwrap_err();
        assert!(matches!(err, SlicerError::EmptyMesh));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            layer_height: 0.0,
            ..Settings::default()
        };
        let err = slice(&test_meshes::cube(10.0), Strategy::Planar, &settings).unwrap_err();
        assert!(matches!(err, SlicerError::InvalidSettings(_)));
    }

    #[test]
    fn test_missing_planes_file() {
        let settings = Settings {
            planes_file: "/nonexistent/planes.txt".into(),
            ..Settings::default()
        };
        for strategy in [Strategy::ProfileGuided, Strategy::DiscretizedInclination] {
            let err = slice(&test_meshes::cube(10.0), strategy, &settings).unwrap_err();
            assert!(matches!(err, SlicerError::PlanesUnreadable { .. }));
        }
    }

    #[test]
    fn test_vip_reads_planes_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0\n15\n30").unwrap();
        let settings = Settings {
            planes_file: file.path().to_path_buf(),
            ..Settings::default()
        };
        let out = slice(
            &test_meshes::tilted_cube(30.0),
            Strategy::DiscretizedInclination,
            &settings,
        )
        .unwrap();
        assert_eq!(out.stream.incline_brackets(), 1);
    }

    #[test]
    fn test_tilted_region_is_clipped() {
        let mesh = test_meshes::cube(10.0);
        let settings = Settings::default();
        let mut diagnostics = Diagnostics::default();
        let (prepared, _) = prepare(&mesh, &settings).unwrap();
        let region = Region {
            orientation: Orientation::new(20.0, 0.0),
            z_lo: 4.0,
            z_hi: 6.0,
        };
        let layers = slice_region(&prepared, &region, &settings, 0, &mut diagnostics);
        assert!(!layers.is_empty());
        let transform = region.orientation.machine_transform(&settings.rotation_center);
        let back = transform.inverse().unwrap();
        for layer in &layers {
            for contour in &layer.contours {
                for p in &contour.points {
                    let world = back.apply_point(&Point3::new(p.x, p.y, layer.z));
                    assert!(world.z > 4.0 - 1e-6 && world.z < 6.0 + 1e-6);
                }
            }
        }
    }
}
