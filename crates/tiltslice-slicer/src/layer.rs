//! Layer classification: contours become walls and fill with the machine
//! state each layer is printed with.

use rayon::prelude::*;
use tiltslice_math::{Path, Point3, STITCH_TOLERANCE};

use crate::infill::generate_infill;
use crate::path::{order_nearest, Polygon};
use crate::perimeter::generate_walls;
use crate::settings::Settings;
use crate::simplify::simplify_path;
use crate::slice::SliceLayer;

/// Contours with less area than this are not printed.
const MIN_PRINTED_AREA: f64 = 1e-9;

/// One printed layer with its paths split by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    /// Height of the layer in its machine frame (mm).
    pub z: f64,
    /// Outermost walls, printed at the wall feed rate.
    pub outer_wall: Vec<Path>,
    /// Walls between outer and inner.
    pub middle_paths: Vec<Path>,
    /// Innermost walls.
    pub inner_paths: Vec<Path>,
    /// Fill lines.
    pub fill: Vec<Path>,
    /// Part-cooling fan off for this layer.
    pub fan_off: bool,
    /// Feed rate for the outer wall (mm/min).
    pub wall_print_speed: u32,
    /// Feed rate for everything else (mm/min).
    pub print_speed: u32,
}

impl Layer {
    /// All paths in print order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.outer_wall
            .iter()
            .chain(&self.middle_paths)
            .chain(&self.inner_paths)
            .chain(&self.fill)
    }

    /// True when nothing would be printed.
    pub fn is_empty(&self) -> bool {
        self.paths().all(Path::is_empty)
    }

    /// Number of printed lines.
    pub fn line_count(&self) -> usize {
        self.paths().map(Path::len).sum()
    }

    /// Total printed length (mm).
    pub fn print_length(&self) -> f64 {
        self.paths().map(Path::length).sum()
    }
}

/// Contours worth printing: simplified, cleaned of collinear vertices and
/// stripped of anything without area.
pub fn printable_contours(slice: &SliceLayer, settings: &Settings) -> Vec<Polygon> {
    slice
        .contours
        .iter()
        .filter_map(|contour| {
            let simplified = Polygon::from_path(&simplify_path(&contour.to_path(slice.z), settings.epsilon))
                .cleaned(STITCH_TOLERANCE);
            (simplified.distinct_len() >= 3 && simplified.signed_area().abs() > MIN_PRINTED_AREA)
                .then_some(simplified)
        })
        .collect()
}

/// Turn the contours of one slice into a printable layer.
///
/// `index` is the global layer index: layer 0 uses the first-layer feed
/// rate and fan setting, and the fill direction alternates with it.
pub fn classify(slice: &SliceLayer, index: usize, settings: &Settings) -> Layer {
    build_layer(slice.z, &printable_contours(slice, settings), index, settings)
}

fn build_layer(z: f64, contours: &[Polygon], index: usize, settings: &Settings) -> Layer {
    let walls = generate_walls(contours, settings.wall_count(), settings.nozzle);
    let fill = if settings.fill_density > 0.0 {
        generate_infill(&walls.fill_boundary, settings.fill_density, settings.nozzle, index)
            .into_iter()
            .map(|(a, b)| Path::from_points(&[Point3::new(a.x, a.y, z), Point3::new(b.x, b.y, z)]))
            .collect()
    } else {
        Vec::new()
    };

    let lift = |polygons: &[Polygon]| -> Vec<Path> { polygons.iter().map(|p| p.to_path(z)).collect() };

    let start = Point3::new(0.0, 0.0, z);
    let (outer_wall, at) = order_nearest(lift(&walls.outer), start);
    let (middle_paths, at) = order_nearest(lift(&walls.middle), at);
    let (inner_paths, at) = order_nearest(lift(&walls.inner), at);
    let (fill, _) = order_nearest(fill, at);

    let (fan_off, wall_print_speed, print_speed) = if index == 0 {
        (
            settings.fan_off_layer1,
            settings.print_speed_layer1,
            settings.print_speed_layer1,
        )
    } else {
        (false, settings.print_speed_wall, settings.print_speed)
    };

    Layer {
        z,
        outer_wall,
        middle_paths,
        inner_paths,
        fill,
        fan_off,
        wall_print_speed,
        print_speed,
    }
}

/// Classify consecutive slices in parallel, numbering them from
/// `first_index`. Slices with nothing printable are dropped before
/// numbering, so the first layer kept is the one printed as `first_index`.
pub fn classify_layers(slices: &[SliceLayer], first_index: usize, settings: &Settings) -> Vec<Layer> {
    let printable: Vec<(f64, Vec<Polygon>)> = slices
        .par_iter()
        .map(|slice| (slice.z, printable_contours(slice, settings)))
        .filter(|(_, contours)| !contours.is_empty())
        .collect();

    printable
        .par_iter()
        .enumerate()
        .map(|(i, (z, contours))| build_layer(*z, contours, first_index + i, settings))
        .collect()
}
