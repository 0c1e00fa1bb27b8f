//! Axis-aligned slicing.

use tiltslice_math::Orientation;
use tiltslice_mesh::Mesh;
use tracing::debug;

use super::{finish, prepare, slice_region, Region, SliceOutput};
use crate::command::InstructionStream;
use crate::error::Result;
use crate::layer::classify_layers;
use crate::settings::Settings;

/// Slice with horizontal layers from the bottom of the mesh to its top, as
/// a single batch.
pub fn slice_planar(mesh: &Mesh, settings: &Settings) -> Result<SliceOutput> {
    let (prepared, mut diagnostics) = prepare(mesh, settings)?;
    let mut stream = InstructionStream::new();

    if let Some((z_lo, z_hi)) = prepared.z_range() {
        let region = Region {
            orientation: Orientation::PLANAR,
            z_lo,
            z_hi,
        };
        let slices = slice_region(&prepared, &region, settings, 0, &mut diagnostics);
        debug!(slices = slices.len(), z_lo, z_hi, "Planar region");
        stream.push_layers(classify_layers(&slices, 0, settings));
    }

    finish(stream, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::strategy::test_meshes::cube;
    use crate::error::GeometryIssue;
    use approx::assert_abs_diff_eq;
    use tiltslice_math::{Point3, Triangle, Vec3};

    #[test]
    fn test_cube_fifty_layers() {
        let out = slice_planar(&cube(10.0), &Settings::default()).unwrap();
        assert!(out.diagnostics.is_clean());
        assert_eq!(out.stream.layer_count(), 50);
        assert_eq!(out.stream.batch_sizes(), vec![50]);
        assert_eq!(out.stream.commands().len(), 1);

        for layer in out.stream.layers() {
            assert_eq!(layer.outer_wall.len(), 1);
            let wall = &layer.outer_wall[0];
            assert!(wall.is_closed());
            assert!(wall.is_continuous());
            assert_abs_diff_eq!(wall.length(), 40.0, epsilon = 1e-9);
            // Seam and side-diagonal points are gone; only corners remain.
            assert_eq!(wall.len(), 4);
            assert_eq!(layer.middle_paths.len(), 1);
            assert_eq!(layer.inner_paths.len(), 1);
            assert!(!layer.fill.is_empty(), "layer at z {} has no fill", layer.z);
        }
    }

    #[test]
    fn test_reversed_facet_slices_every_layer() {
        let mut mesh = cube(10.0);
        let [a, b, c] = mesh.triangles[4].vertices;
        mesh.triangles[4] = Triangle::new(a, c, b);

        let out = slice_planar(&mesh, &Settings::default()).unwrap();
        assert!(out.diagnostics.is_clean());
        assert_eq!(out.stream.layer_count(), 50);
        assert!(out.stream.layers().all(|l| l.outer_wall.len() == 1 && !l.fill.is_empty()));
    }

    #[test]
    fn test_broken_part_does_not_stop_the_rest() {
        let intact = cube(10.0);
        let mut broken = cube(10.0).translated(&Vec3::new(20.0, 0.0, 0.0));
        broken.triangles.remove(4);
        let mut triangles = intact.triangles;
        triangles.extend(broken.triangles);

        let out = slice_planar(&Mesh::new(triangles), &Settings::default()).unwrap();
        assert_eq!(out.stream.layer_count(), 50);
        for layer in out.stream.layers() {
            assert_eq!(layer.outer_wall.len(), 1);
            assert!(layer.outer_wall[0].points().iter().all(|p| p.x <= 10.0));
        }

        assert_eq!(out.diagnostics.counts(), (0, 50, 0));
        for index in [0, 25, 49] {
            assert!(out.diagnostics.issues.iter().any(|issue| matches!(
                issue,
                GeometryIssue::OpenContour { layer, .. } if *layer == index
            )));
        }
    }

    #[test]
    fn test_no_fill_without_density() {
        let settings = Settings {
            fill_density: 0.0,
            ..Settings::default()
        };
        let out = slice_planar(&cube(10.0), &settings).unwrap();
        assert!(out.stream.layers().all(|l| l.fill.is_empty()));
    }

    #[test]
    fn test_one_layer_height_gives_one_layer() {
        let mesh = Mesh::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 0.2));
        let out = slice_planar(&mesh, &Settings::default()).unwrap();
        assert_eq!(out.stream.layer_count(), 1);
    }

    #[test]
    fn test_first_layer_index() {
        let out = slice_planar(&cube(2.0), &Settings::default()).unwrap();
        match &out.stream.commands()[0] {
            Command::Layers(batch) => {
                assert_eq!(batch.first_index, 0);
                assert_eq!(batch.layers.len(), 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
